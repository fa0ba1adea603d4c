//! `orderBy` filter: `array | orderBy:properties:directions`.
//!
//! Properties are property paths (`'name'`, `'person.title'`, `0`) or a list
//! of them; directions are `'asc'`/`'desc'` or a list. Keys without a
//! matching direction sort ascending. With no properties the elements
//! themselves are compared. The sort is stable.

use std::cmp::Ordering;

use super::ValidationError;
use super::args::{arg, check_arity, ensure_array};
use crate::template::value::{Value, format_number};

const NAME: &str = "orderBy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

pub(super) fn order_by_filter(args: &[Value]) -> Result<Value, ValidationError> {
    check_arity(NAME, args, 3)?;

    let items = ensure_array(arg(args, 0));
    let properties = property_paths(arg(args, 1))?;
    let directions = directions(arg(args, 2))?;

    let nested = items.iter().filter(|item| matches!(item, Value::Array(_))).count();
    if nested == 0 {
        return Ok(Value::Array(sort(items, &properties, &directions)));
    }
    if nested != items.len() {
        return Err(ValidationError::new(
            NAME,
            0,
            "cannot mix arrays and non-array elements",
        ));
    }

    // Array of arrays: sort each group independently, then concatenate.
    let mut out = Vec::new();
    for group in items {
        if let Value::Array(group) = group {
            out.extend(sort(group, &properties, &directions));
        }
    }
    Ok(Value::Array(out))
}

fn property_paths(value: &Value) -> Result<Vec<String>, ValidationError> {
    let key = |v: &Value| match v {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(ValidationError::new(
            NAME,
            1,
            format!("expected a property name, got {}", other.type_name()),
        )),
    };

    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(key).collect(),
        other => Ok(vec![key(other)?]),
    }
}

fn directions(value: &Value) -> Result<Vec<Direction>, ValidationError> {
    let direction = |v: &Value| match v {
        Value::String(s) if s == "asc" => Ok(Direction::Asc),
        Value::String(s) if s == "desc" => Ok(Direction::Desc),
        other => Err(ValidationError::new(
            NAME,
            2,
            format!(
                "must be one of the following values: asc, desc (got {})",
                describe(other)
            ),
        )),
    };

    match value {
        Value::Undefined | Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.iter().map(direction).collect(),
        other => Ok(vec![direction(other)?]),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.type_name().to_string(),
    }
}

fn sort(mut items: Vec<Value>, properties: &[String], directions: &[Direction]) -> Vec<Value> {
    if properties.is_empty() {
        let direction = directions.first().copied().unwrap_or(Direction::Asc);
        items.sort_by(|a, b| directed(a.sort_cmp(b), direction));
        return items;
    }

    items.sort_by(|a, b| {
        for (i, path) in properties.iter().enumerate() {
            let direction = directions.get(i).copied().unwrap_or(Direction::Asc);
            let ordering = directed(
                resolve_path(a, path).sort_cmp(resolve_path(b, path)),
                direction,
            );
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    items
}

fn directed(ordering: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

/// Direct key first, then a dotted path.
fn resolve_path<'a>(value: &'a Value, path: &str) -> &'a Value {
    static UNDEFINED: Value = Value::Undefined;

    if let Some(found) = value.property_ref(path) {
        return found;
    }
    if !path.contains('.') {
        return &UNDEFINED;
    }
    path.split('.')
        .try_fold(value, |current, segment| current.property_ref(segment))
        .unwrap_or(&UNDEFINED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn run(args: &[Value]) -> Result<Value, ValidationError> {
        order_by_filter(args)
    }

    fn names(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.property("name").render_text())
            .collect()
    }

    fn people() -> Value {
        Value::from(json!([
            {"name": "Cy", "team": "b", "meta": {"rank": 2}},
            {"name": "Ann", "team": "a", "meta": {"rank": 3}},
            {"name": "Bo", "team": "b", "meta": {"rank": 1}},
            {"name": "Al", "team": "a", "meta": {"rank": 1}},
        ]))
    }

    #[test]
    fn sorts_by_single_property() {
        let result = run(&[people(), Value::from("name")]).unwrap();
        assert_eq!(names(&result), ["Al", "Ann", "Bo", "Cy"]);
    }

    #[test]
    fn sorts_by_multiple_keys_with_directions() {
        let result = run(&[
            people(),
            Value::from(json!(["team", "name"])),
            Value::from(json!(["desc"])),
        ])
        .unwrap();
        assert_eq!(names(&result), ["Bo", "Cy", "Al", "Ann"]);
    }

    #[test]
    fn follows_dotted_paths() {
        let result = run(&[people(), Value::from("meta.rank"), Value::from("desc")]).unwrap();
        assert_eq!(names(&result), ["Ann", "Cy", "Bo", "Al"]);
    }

    #[test]
    fn sort_is_stable() {
        let result = run(&[people(), Value::from("team")]).unwrap();
        assert_eq!(names(&result), ["Ann", "Al", "Cy", "Bo"]);
    }

    #[test]
    fn sorts_scalars_without_properties() {
        let result = run(&[Value::from(json!([3, 1, 2]))]).unwrap();
        assert_eq!(result, Value::from(json!([1, 2, 3])));
    }

    #[test]
    fn sorts_groups_of_arrays_independently() {
        let result = run(&[Value::from(json!([[3, 1], [2, 0]]))]).unwrap();
        assert_eq!(result, Value::from(json!([1, 3, 0, 2])));

        let err = run(&[Value::from(json!([[3, 1], 2]))]).unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn rejects_bad_properties_and_directions() {
        let err = run(&[people(), Value::Bool(true)]).unwrap_err();
        assert_eq!((err.filter, err.index), ("orderBy", 1));

        let err = run(&[people(), Value::from("name"), Value::from("!asc")]).unwrap_err();
        assert_eq!(err.index, 2);

        let err = run(&[people(), Value::from("name"), Value::Array(vec![Value::Undefined])])
            .unwrap_err();
        assert_eq!(err.index, 2);
    }

    proptest! {
        #[test]
        fn desc_reverses_asc_for_distinct_keys(mut keys in proptest::collection::vec(0i64..1000, 0..20)) {
            keys.sort_unstable();
            keys.dedup();
            let input = Value::Array(keys.iter().rev().map(|k| Value::from(*k)).collect());
            let asc = run(&[input.clone(), Value::Null, Value::from("asc")]).unwrap();
            let desc = run(&[input, Value::Null, Value::from("desc")]).unwrap();
            let mut reversed = desc.as_array().unwrap().to_vec();
            reversed.reverse();
            prop_assert_eq!(asc, Value::Array(reversed));
        }

        #[test]
        fn keyed_desc_after_asc_reverses_order(keys in proptest::collection::hash_set(-500i64..500, 0..20)) {
            let input = Value::Array(
                keys.iter()
                    .enumerate()
                    .map(|(id, k)| Value::from(json!({"k": k, "id": id})))
                    .collect(),
            );
            let by_k = Value::Array(vec![Value::from("k")]);
            let asc = run(&[input, by_k.clone(), Value::Array(vec![Value::from("asc")])]).unwrap();
            let desc = run(&[asc.clone(), by_k, Value::Array(vec![Value::from("desc")])]).unwrap();

            let mut reversed = asc.as_array().unwrap().to_vec();
            reversed.reverse();
            prop_assert_eq!(desc, Value::Array(reversed));
        }
    }
}
