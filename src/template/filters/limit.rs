//! `limit` filter: `array | limit:count:offset`.

use super::ValidationError;
use super::args::{arg, check_arity, ensure_array, optional_count};
use crate::template::value::Value;

const NAME: &str = "limit";

/// Number of elements kept when no count is given.
pub const LIMIT_DEFAULT: usize = 5;
/// Elements skipped when no offset is given.
pub const OFFSET_DEFAULT: usize = 0;

pub(super) fn limit_filter(args: &[Value]) -> Result<Value, ValidationError> {
    check_arity(NAME, args, 3)?;

    let items = ensure_array(arg(args, 0));
    let limit = optional_count(NAME, 1, arg(args, 1))?.unwrap_or(LIMIT_DEFAULT);
    let offset = optional_count(NAME, 2, arg(args, 2))?.unwrap_or(OFFSET_DEFAULT);

    let start = offset.min(items.len());
    let end = offset.saturating_add(limit).min(items.len());
    Ok(Value::Array(items[start..end].to_vec()))
}
