//! Named filters usable in placeholder pipelines (`value | name:arg:arg`).
//!
//! Every filter validates its arguments against a fixed contract before
//! running. Only `null`/`undefined` receive defaults; any other argument of
//! the wrong shape fails with a [`ValidationError`] naming the filter and the
//! offending argument position (0 is the piped input).
//!
//! | Filter | Arguments |
//! |---|---|
//! | `case` | value, transform (`capital` / `lower` / `upper`) |
//! | `date` | date-like value, format pattern |
//! | `limit` | array, count (default 5), offset (default 0) |
//! | `orderBy` | array, properties, directions (`asc` / `desc`) |
//! | `where` | array, predicate expression |
//! | `partition` | array, predicate expression |

mod args;
mod case;
mod date;
mod limit;
mod order_by;
mod where_filter;

use phf::phf_map;
use thiserror::Error;

use crate::template::value::Value;

pub use case::CaseTransform;
pub use date::{DEFAULT_DATE_FORMAT, format_date, parse_date};
pub use limit::{LIMIT_DEFAULT, OFFSET_DEFAULT};

/// A filter argument violated the filter's contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filter}: argument {index}: {message}")]
pub struct ValidationError {
    /// Registered filter name.
    pub filter: &'static str,
    /// 0-based argument position; 0 is the piped input.
    pub index: usize,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(filter: &'static str, index: usize, message: impl Into<String>) -> Self {
        Self {
            filter,
            index,
            message: message.into(),
        }
    }
}

/// Signature shared by all filters. `args[0]` is the piped input.
pub type FilterFn = fn(&[Value]) -> Result<Value, ValidationError>;

/// Compile-time registry of filters by name.
static FILTERS: phf::Map<&'static str, FilterFn> = phf_map! {
    "case" => case::case_filter,
    "date" => date::date_filter,
    "limit" => limit::limit_filter,
    "orderBy" => order_by::order_by_filter,
    "partition" => where_filter::partition_filter,
    "where" => where_filter::where_filter,
};

/// Look up a filter by its registered name.
pub fn lookup(name: &str) -> Option<FilterFn> {
    FILTERS.get(name).copied()
}

/// Registered filter names, in no particular order.
pub fn names() -> impl Iterator<Item = &'static str> {
    FILTERS.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_every_filter() {
        let mut all: Vec<_> = names().collect();
        all.sort_unstable();
        assert_eq!(all, ["case", "date", "limit", "orderBy", "partition", "where"]);
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn validation_error_message_names_filter_and_argument() {
        let err = ValidationError::new("limit", 1, "must be a non-negative integer");
        assert_eq!(err.to_string(), "limit: argument 1: must be a non-negative integer");
    }
}
