//! `$ref` dereferencing.
//!
//! An object of the form `{"$ref": "#/json/pointer"}` is replaced by the
//! value the pointer designates within the same document. Referenced values
//! are themselves dereferenced. Sibling keys of `$ref` are ignored.

use serde_json::{Map, Value};

use crate::common::{Error, Result};

const REF_KEY: &str = "$ref";

/// Resolve every `$ref` in `document`.
pub fn dereference(document: &Value) -> Result<Value> {
    let mut active = Vec::new();
    resolve(document, document, &mut active)
}

fn resolve(root: &Value, node: &Value, active: &mut Vec<String>) -> Result<Value> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get(REF_KEY) {
                return resolve_reference(root, reference, active);
            }
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), resolve(root, value, active)?);
            }
            Ok(Value::Object(out))
        },
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(root, item, active))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn resolve_reference(root: &Value, reference: &Value, active: &mut Vec<String>) -> Result<Value> {
    let Value::String(reference) = reference else {
        return Err(Error::Data(format!("{REF_KEY} must be a string, got {reference}")));
    };
    let pointer = reference.strip_prefix('#').ok_or_else(|| {
        Error::Data(format!(
            "unsupported reference '{reference}': only document-local '#/...' pointers are allowed"
        ))
    })?;
    let pointer = urlencoding::decode(pointer)
        .map_err(|e| Error::Data(format!("invalid reference '{reference}': {e}")))?
        .into_owned();

    if active.contains(&pointer) {
        return Err(Error::Data(format!("circular reference '{reference}'")));
    }
    let target = root
        .pointer(&pointer)
        .ok_or_else(|| Error::Data(format!("unresolved reference '{reference}'")))?;

    active.push(pointer);
    let resolved = resolve(root, target, active);
    active.pop();
    resolved
}
