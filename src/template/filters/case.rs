//! `case` filter.

use super::ValidationError;
use super::args::{arg, check_arity, optional_strict_string};
use crate::template::value::Value;

const NAME: &str = "case";

/// Case transformations accepted by the `case` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTransform {
    /// First letter of every word upper case, the rest lower case.
    Capital,
    Lower,
    Upper,
}

impl CaseTransform {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "capital" => Some(CaseTransform::Capital),
            "lower" => Some(CaseTransform::Lower),
            "upper" => Some(CaseTransform::Upper),
            _ => None,
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            CaseTransform::Capital => capital_case(text),
            CaseTransform::Lower => text.to_lowercase(),
            CaseTransform::Upper => text.to_uppercase(),
        }
    }
}

pub(super) fn case_filter(args: &[Value]) -> Result<Value, ValidationError> {
    check_arity(NAME, args, 2)?;

    let text = match arg(args, 0) {
        Value::Undefined | Value::Null => String::new(),
        value @ (Value::Array(_) | Value::Object(_)) => {
            return Err(ValidationError::new(
                NAME,
                0,
                format!("expected a string, got {}", value.type_name()),
            ));
        },
        value => value.to_text().unwrap_or_default(),
    };

    let transform = match optional_strict_string(NAME, 1, arg(args, 1))? {
        None => None,
        Some(name) => Some(CaseTransform::from_name(name).ok_or_else(|| {
            ValidationError::new(
                NAME,
                1,
                format!("must be one of the following values: capital, lower, upper (got '{name}')"),
            )
        })?),
    };

    Ok(Value::String(match transform {
        Some(transform) => transform.apply(&text),
        None => text,
    }))
}

/// Split into words on whitespace and lower-to-upper case boundaries, then
/// capitalize each word and join with single spaces.
fn capital_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for word in split_words(text) {
        if !out.is_empty() {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            for c in chars {
                out.extend(c.to_lowercase());
            }
        }
    }

    out
}

fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();

    for chunk in text.split_whitespace() {
        let mut start = 0;
        let mut prev: Option<char> = None;
        for (i, c) in chunk.char_indices() {
            if let Some(p) = prev
                && (p.is_lowercase() || p.is_ascii_digit())
                && c.is_uppercase()
            {
                words.push(&chunk[start..i]);
                start = i;
            }
            prev = Some(c);
        }
        words.push(&chunk[start..]);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(args: &[Value]) -> Result<Value, ValidationError> {
        case_filter(args)
    }

    #[test]
    fn transforms_text() {
        let input = Value::from("hello wORLD");
        assert_eq!(
            run(&[input.clone(), Value::from("upper")]).unwrap(),
            Value::from("HELLO WORLD")
        );
        assert_eq!(
            run(&[input.clone(), Value::from("lower")]).unwrap(),
            Value::from("hello world")
        );
        assert_eq!(
            run(&[input.clone(), Value::from("capital")]).unwrap(),
            Value::from("Hello W Orld")
        );
        assert_eq!(run(&[input]).unwrap(), Value::from("hello wORLD"));
    }

    #[test]
    fn keeps_punctuation_and_coerces_scalars() {
        let cases = [
            (Value::Undefined, Value::Undefined, ""),
            (Value::Null, Value::Null, ""),
            (Value::from("HELLO, world!"), Value::Undefined, "HELLO, world!"),
            (Value::from("HELLO, world!"), Value::Null, "HELLO, world!"),
            (Value::from("HELLO, world!"), Value::from("capital"), "Hello, World!"),
            (Value::from("HELLO, world!"), Value::from("lower"), "hello, world!"),
            (Value::from("HELLO, world!"), Value::from("upper"), "HELLO, WORLD!"),
            (Value::Bool(false), Value::from("lower"), "false"),
            (Value::Number(0.0), Value::Undefined, "0"),
            (Value::Number(1.0), Value::from("capital"), "1"),
            (Value::Number(f64::NAN), Value::from("lower"), "nan"),
        ];
        for (value, transform, expected) in cases {
            assert_eq!(
                run(&[value.clone(), transform.clone()]).unwrap(),
                Value::from(expected),
                "{value:?} | case:{transform:?}"
            );
        }
    }

    #[test]
    fn capital_case_splits_camel_case() {
        assert_eq!(capital_case("orgChartDirection"), "Org Chart Direction");
        assert_eq!(capital_case("  spaced   out "), "Spaced Out");
    }

    #[test]
    fn nullish_input_becomes_empty_string() {
        assert_eq!(run(&[Value::Undefined]).unwrap(), Value::from(""));
        assert_eq!(run(&[Value::Null, Value::from("upper")]).unwrap(), Value::from(""));
    }

    #[test]
    fn scalars_are_stringified() {
        assert_eq!(run(&[Value::Number(42.0)]).unwrap(), Value::from("42"));
        assert_eq!(run(&[Value::Bool(true), Value::from("upper")]).unwrap(), Value::from("TRUE"));
    }

    #[test]
    fn rejects_containers_and_unknown_transforms() {
        let err = run(&[Value::Array(vec![])]).unwrap_err();
        assert_eq!((err.filter, err.index), ("case", 0));

        let err = run(&[Value::Object(Default::default())]).unwrap_err();
        assert_eq!(err.index, 0);

        let err = run(&[Value::from("x"), Value::from("title")]).unwrap_err();
        assert_eq!(err.index, 1);

        let err = run(&[Value::from("x"), Value::Number(1.0)]).unwrap_err();
        assert_eq!(err.index, 1);
    }

    proptest! {
        #[test]
        fn lower_after_upper_equals_lower(text in "[a-zA-Z0-9 ,.!]{0,24}") {
            let upper = run(&[Value::from(text.as_str()), Value::from("upper")]).unwrap();
            let lowered = run(&[upper, Value::from("lower")]).unwrap();
            let lower = run(&[Value::from(text.as_str()), Value::from("lower")]).unwrap();
            prop_assert_eq!(lowered, lower);
        }

        #[test]
        fn transforms_are_idempotent(text in "[a-zA-Z0-9 ]{0,24}") {
            for name in ["capital", "lower", "upper"] {
                let once = run(&[Value::from(text.as_str()), Value::from(name)]).unwrap();
                let twice = run(&[once.clone(), Value::from(name)]).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
