//! Argument contract helpers shared by the filters.

use super::ValidationError;
use crate::template::value::{Value, parse_numeric_string};

/// Argument at `index`, or `undefined` when absent.
#[inline]
pub(super) fn arg(args: &[Value], index: usize) -> &Value {
    static UNDEFINED: Value = Value::Undefined;
    args.get(index).unwrap_or(&UNDEFINED)
}

/// Reject calls with more arguments than the contract allows.
pub(super) fn check_arity(
    filter: &'static str,
    args: &[Value],
    max: usize,
) -> Result<(), ValidationError> {
    if args.len() > max {
        return Err(ValidationError::new(
            filter,
            max,
            format!("expected at most {} argument(s), got {}", max.saturating_sub(1), args.len() - 1),
        ));
    }
    Ok(())
}

/// Array view of the piped input: nullish becomes empty and any other
/// non-array value is wrapped as a single element.
pub(super) fn ensure_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Undefined | Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Optional non-negative integer. Numeric strings are accepted.
pub(super) fn optional_count(
    filter: &'static str,
    index: usize,
    value: &Value,
) -> Result<Option<usize>, ValidationError> {
    let number = match value {
        Value::Undefined | Value::Null => return Ok(None),
        Value::Number(n) => *n,
        Value::String(s) if !s.trim().is_empty() => parse_numeric_string(s),
        other => {
            return Err(ValidationError::new(
                filter,
                index,
                format!("expected a number, got {}", other.type_name()),
            ));
        },
    };

    if number.is_nan() {
        return Err(ValidationError::new(filter, index, "expected a number, got NaN"));
    }
    if number.fract() != 0.0 || number.is_infinite() {
        return Err(ValidationError::new(filter, index, "must be an integer"));
    }
    if number < 0.0 {
        return Err(ValidationError::new(filter, index, "must be greater than or equal to 0"));
    }
    Ok(Some(number as usize))
}

/// Optional string that is not coerced from other types.
pub(super) fn optional_strict_string<'a>(
    filter: &'static str,
    index: usize,
    value: &'a Value,
) -> Result<Option<&'a str>, ValidationError> {
    match value {
        Value::Undefined | Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(ValidationError::new(
            filter,
            index,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

/// Required string that is not coerced from other types.
pub(super) fn required_strict_string<'a>(
    filter: &'static str,
    index: usize,
    value: &'a Value,
) -> Result<&'a str, ValidationError> {
    optional_strict_string(filter, index, value)?
        .ok_or_else(|| ValidationError::new(filter, index, "is a required field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accept_integers_and_numeric_strings() {
        assert_eq!(optional_count("limit", 1, &Value::Number(3.0)), Ok(Some(3)));
        assert_eq!(optional_count("limit", 1, &Value::from("4")), Ok(Some(4)));
        assert_eq!(optional_count("limit", 1, &Value::Null), Ok(None));
    }

    #[test]
    fn counts_reject_everything_else() {
        for bad in [
            Value::Number(-1.0),
            Value::Number(1.5),
            Value::Number(f64::NAN),
            Value::Bool(true),
            Value::from(""),
            Value::from("abc"),
            Value::Array(vec![]),
        ] {
            let err = optional_count("limit", 2, &bad).unwrap_err();
            assert_eq!(err.index, 2, "{bad:?}");
        }
    }

    #[test]
    fn ensure_array_wraps_scalars() {
        assert_eq!(ensure_array(&Value::Null), Vec::<Value>::new());
        assert_eq!(ensure_array(&Value::from("x")), vec![Value::from("x")]);
    }

    #[test]
    fn too_many_arguments_are_rejected() {
        let args = [Value::Null, Value::Null, Value::Null];
        assert!(check_arity("where", &args, 2).is_err());
        assert!(check_arity("where", &args[..2], 2).is_ok());
    }
}
