//! Parser for template placeholder expressions.
//!
//! Placeholders are a small JavaScript-like expression language extended
//! with `|` filter chains (`people | where:'team == "Core"' | limit:3`).

pub mod ast;
pub mod expr;
pub mod literal;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use expr::{ParseError, parse_expression};
