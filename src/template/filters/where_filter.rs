//! `where` and `partition` filters.
//!
//! The predicate is an expression string evaluated once per element with
//! the element as the scope: `people | where:'team == "Core" && !manager'`.

use super::ValidationError;
use super::args::{arg, check_arity, ensure_array, required_strict_string};
use crate::template::expr::{self, ExprErrorKind, Scope};
use crate::template::value::Value;

/// Split `items` by the predicate compiled from `args[1]`.
fn split(
    filter: &'static str,
    args: &[Value],
) -> Result<(Vec<Value>, Vec<Value>), ValidationError> {
    check_arity(filter, args, 2)?;

    let items = ensure_array(arg(args, 0));
    let condition = required_strict_string(filter, 1, arg(args, 1))?;
    let predicate = expr::compile(condition)
        .map_err(|err| ValidationError::new(filter, 1, err.to_string()))?;

    let mut matching = Vec::new();
    let mut rest = Vec::new();
    for item in items {
        let keep = predicate
            .evaluate(&Scope::root(&item))
            .map_err(|err| match err.into_kind() {
                ExprErrorKind::Validation(inner) => inner,
                other => ValidationError::new(filter, 1, other.to_string()),
            })?
            .is_truthy();
        if keep {
            matching.push(item);
        } else {
            rest.push(item);
        }
    }

    Ok((matching, rest))
}

pub(super) fn where_filter(args: &[Value]) -> Result<Value, ValidationError> {
    let (matching, _) = split("where", args)?;
    Ok(Value::Array(matching))
}

pub(super) fn partition_filter(args: &[Value]) -> Result<Value, ValidationError> {
    let (matching, rest) = split("partition", args)?;
    Ok(Value::Array(vec![Value::Array(matching), Value::Array(rest)]))
}
