//! Dynamic values flowing through template expressions.
//!
//! Data documents arrive as JSON/YAML trees; expressions and filters operate
//! on [`Value`], which adds the two things JSON lacks: an `Undefined` state
//! for absent paths and a first-class date produced by `$util.now` and the
//! `date` filter. Coercions follow the loose rules template authors expect
//! from JavaScript-flavoured expression languages.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// A value produced by evaluating a template expression.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent path or missing argument.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<FixedOffset>),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Human readable type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness: `false`, `0`, `NaN`, `""`, `null` and `undefined` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Numeric coercion.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            },
            Value::Number(n) => *n,
            Value::String(s) => parse_numeric_string(s),
            Value::Date(d) => d.timestamp_millis() as f64,
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) => f64::NAN,
        }
    }

    /// String coercion for values that have a natural textual form.
    ///
    /// Objects have none and return `None`; arrays join their elements with
    /// commas, rendering nullish elements as empty strings.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Undefined => Some("undefined".to_string()),
            Value::Null => Some("null".to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::String(s) => Some(s.clone()),
            Value::Date(d) => Some(d.to_rfc3339_opts(SecondsFormat::Secs, false)),
            Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_nullish() {
                        parts.push(String::new());
                    } else {
                        parts.push(item.to_text()?);
                    }
                }
                Some(parts.join(","))
            },
            Value::Object(_) => None,
        }
    }

    /// Text written into a document when a placeholder resolves to this value.
    pub fn render_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Object(_) => "[object Object]".to_string(),
            other => other.to_text().unwrap_or_default(),
        }
    }

    /// Borrowing property access for object keys and array indices.
    pub fn property_ref(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Property access. Absent properties resolve to `Undefined`.
    pub fn property(&self, key: &str) -> Value {
        if let Some(v) = self.property_ref(key) {
            return v.clone();
        }
        match self {
            Value::Array(items) if key == "length" => Value::Number(items.len() as f64),
            Value::String(s) if key == "length" => Value::Number(s.chars().count() as f64),
            Value::String(s) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Property access that moves the child out of an owned value.
    pub fn into_property(self, key: &str) -> Value {
        match self {
            Value::Object(mut map) => map.swap_remove(key).unwrap_or(Value::Undefined),
            Value::Array(mut items) => match key.parse::<usize>() {
                Ok(i) if i < items.len() => items.swap_remove(i),
                _ => Value::Array(items).property(key),
            },
            other => other.property(key),
        }
    }

    /// Strict equality (`===`). Containers compare structurally.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            },
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.strict_eq(w)))
            },
            _ => false,
        }
    }

    /// Loose equality (`==`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Date(_), Value::String(_)) | (Value::String(_), Value::Date(_)) => {
                self.to_text() == other.to_text()
            },
            _ => self.strict_eq(other),
        }
    }

    /// Ordering used by sorting filters.
    ///
    /// Values of the same scalar kind compare naturally; containers compare
    /// equal so that stable sorts leave them in place; mixed kinds order by
    /// kind with `null` and `undefined` last.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Date(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
            Value::Null => 5,
            Value::Undefined => 6,
        }
    }

    /// Convert back to JSON. Dates become RFC 3339 strings and `undefined`
    /// becomes `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Secs, false))
            },
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // NaN equals itself here so that test assertions on filter output work.
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Value::Date(d)
    }
}

/// Format a number the way template output expects: integers without a
/// fractional part, shortest round-trip representation otherwise.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{}", n as i128);
    }
    let mut buffer = ryu::Buffer::new();
    let s = buffer.format(n);
    s.strip_suffix(".0").unwrap_or(s).to_string()
}

pub(crate) fn parse_numeric_string(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

/// Text of a value, borrowing when it is already a string.
pub(crate) fn text_cow(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s)),
        other => other.to_text().map(Cow::Owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_preserves_key_order() {
        let value = Value::from(json!({"b": 1, "a": [true, null, "x"]}));
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(value.to_json(), json!({"b": 1.0, "a": [true, null, "x"]}));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn property_access() {
        let value = Value::from(json!({"list": [1, 2, 3], "name": "Ada"}));
        assert_eq!(value.property("list").property("length"), Value::Number(3.0));
        assert_eq!(value.property("name").property("length"), Value::Number(3.0));
        assert_eq!(value.property("list").property("1"), Value::Number(2.0));
        assert_eq!(value.property("missing").property("deeper"), Value::Undefined);
    }

    #[test]
    fn loose_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(Value::from("2").loose_eq(&Value::Number(2.0)));
        assert!(!Value::from("2").strict_eq(&Value::Number(2.0)));
        assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));
    }

    #[test]
    fn array_text_skips_nullish() {
        let value = Value::Array(vec![Value::from("a"), Value::Null, Value::Number(1.0)]);
        assert_eq!(value.to_text().as_deref(), Some("a,,1"));
    }
}
