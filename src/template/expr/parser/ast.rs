//! AST types for template expressions.

use crate::template::value::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Binary operators, including the short-circuiting logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Expression AST produced by the parser and walked by the engine.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value (number, string, boolean, null, undefined).
    Literal(Value),
    /// `this`, the current scope.
    This,
    /// Bare identifier resolved against the scope chain.
    Identifier(String),
    /// `object.property`
    Member { object: Box<Expr>, property: String },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// Method or function call.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `[a, b, c]`
    Array(Vec<Expr>),
    /// `{key: value}`
    Object(Vec<(String, Expr)>),
    /// `input | name:arg1:arg2`
    Filter {
        name: String,
        input: Box<Expr>,
        args: Vec<Expr>,
    },
}
