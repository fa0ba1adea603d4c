//! Lexical scope chain used while rendering sections.

use crate::template::value::Value;

/// One frame of the scope chain.
///
/// Sections push a frame per iteration; identifier lookup walks from the
/// innermost frame outwards and stops at the first object frame that has the
/// key, so an item's own properties shadow outer data.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    value: &'a Value,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            parent: None,
        }
    }

    /// Create a child frame whose current value is `value`.
    pub fn push(&'a self, value: &'a Value) -> Scope<'a> {
        Scope {
            value,
            parent: Some(self),
        }
    }

    /// The value of the innermost frame (`this` / `.`).
    pub fn current(&self) -> &'a Value {
        self.value
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        let mut frame = Some(self);
        while let Some(scope) = frame {
            if let Value::Object(map) = scope.value
                && let Some(found) = map.get(name)
            {
                return Some(found);
            }
            frame = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inner_frames_shadow_outer_frames() {
        let root = Value::from(json!({"name": "Org", "team": "All"}));
        let item = Value::from(json!({"name": "Ada"}));
        let scope = Scope::root(&root);
        let inner = scope.push(&item);

        assert_eq!(inner.lookup("name"), Some(&Value::from("Ada")));
        assert_eq!(inner.lookup("team"), Some(&Value::from("All")));
        assert_eq!(inner.lookup("missing"), None);
        assert_eq!(inner.current(), &item);
    }

    #[test]
    fn scalar_frames_are_skipped_during_lookup() {
        let root = Value::from(json!({"label": "x"}));
        let item = Value::from("scalar");
        let scope = Scope::root(&root);
        let inner = scope.push(&item);
        assert_eq!(inner.lookup("label"), Some(&Value::from("x")));
    }
}
