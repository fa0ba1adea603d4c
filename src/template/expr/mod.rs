//! Template placeholder expressions.
//!
//! A placeholder such as `{{ people | orderBy:'name' | limit:3 }}` is
//! compiled once into an [`Expression`] and evaluated against a [`Scope`]
//! for every place it is rendered.
//!
//! ```
//! use dex::template::expr::{Scope, compile};
//! use dex::template::value::Value;
//!
//! let data = Value::from(serde_json::json!({"org": {"name": "Acme"}}));
//! let expr = compile("org.name | case:'upper'").unwrap();
//! let value = expr.evaluate(&Scope::root(&data)).unwrap();
//! assert_eq!(value, Value::from("ACME"));
//! ```

mod engine;
pub mod parser;
mod scope;

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::template::filters::ValidationError;
use crate::template::value::Value;
use parser::Expr;

pub use scope::Scope;

/// What went wrong while compiling or evaluating an expression.
#[derive(Debug, Clone)]
pub enum ExprErrorKind {
    Syntax { offset: usize, message: String },
    UnknownFilter(String),
    Evaluation(String),
    Validation(ValidationError),
}

impl fmt::Display for ExprErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprErrorKind::Syntax { offset, message } => {
                write!(f, "syntax error at offset {offset}: {message}")
            },
            ExprErrorKind::UnknownFilter(name) => write!(f, "unknown filter '{name}'"),
            ExprErrorKind::Evaluation(message) => f.write_str(message),
            ExprErrorKind::Validation(err) => write!(f, "{err}"),
        }
    }
}

/// An expression error together with the placeholder text it came from.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct ExprError {
    text: String,
    kind: ExprErrorKind,
}

impl ExprError {
    fn new(text: &str, kind: ExprErrorKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
        }
    }

    /// The placeholder text as written in the template.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &ExprErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ExprErrorKind {
        self.kind
    }
}

/// A compiled placeholder expression.
#[derive(Debug, Clone)]
pub struct Expression {
    text: String,
    ast: Expr,
}

impl Expression {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against `scope`, producing an owned value.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, ExprError> {
        engine::evaluate(&self.ast, scope)
            .map(Cow::into_owned)
            .map_err(|kind| ExprError::new(&self.text, kind))
    }
}

/// Compile placeholder text.
///
/// Typographic quotes inserted by presentation editors are folded to their
/// ASCII forms and a lone `.` means the current scope value.
pub fn compile(text: &str) -> Result<Expression, ExprError> {
    let normalized = normalize(text);
    let ast = parser::parse_expression(&normalized).map_err(|err| {
        let kind = match err.unknown_filter {
            Some(name) => ExprErrorKind::UnknownFilter(name),
            None => ExprErrorKind::Syntax {
                offset: err.offset,
                message: err.message,
            },
        };
        ExprError::new(text, kind)
    })?;

    Ok(Expression {
        text: text.to_string(),
        ast,
    })
}

fn normalize(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed == "." {
        return Cow::Borrowed("this");
    }
    if !trimmed.contains(['\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}']) {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(
        trimmed
            .chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                other => other,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folds_typographic_quotes() {
        let data = Value::from(json!({"name": "ada"}));
        let expr = compile("name | case:\u{2018}upper\u{2019}").unwrap();
        assert_eq!(
            expr.evaluate(&Scope::root(&data)).unwrap(),
            Value::from("ADA")
        );
        assert_eq!(expr.text(), "name | case:\u{2018}upper\u{2019}");
    }

    #[test]
    fn syntax_errors_keep_placeholder_text() {
        let err = compile("a +").unwrap_err();
        assert_eq!(err.text(), "a +");
        assert!(matches!(err.kind(), ExprErrorKind::Syntax { .. }));
    }

    #[test]
    fn unknown_filters_fail_at_compile_time() {
        let err = compile("a | nope").unwrap_err();
        assert!(matches!(err.kind(), ExprErrorKind::UnknownFilter(name) if name == "nope"));
    }

    #[test]
    fn filter_validation_surfaces_as_validation_kind() {
        let data = Value::from(json!({"items": [1, 2]}));
        let expr = compile("items | limit:-1").unwrap();
        let err = expr.evaluate(&Scope::root(&data)).unwrap_err();
        assert!(matches!(err.kind(), ExprErrorKind::Validation(v) if v.filter == "limit"));
    }
}
