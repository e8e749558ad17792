use serde::Serialize;

use crate::token::Token;

/// Identity handle of a reference-producing node (`Variable`, `Assign`,
/// `This`, `Super`).  Two structurally identical `x` references get distinct
/// ids, so the resolver's side table is keyed by node, not by shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value out of the token so the tree does not depend on
/// the token buffer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Fox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// `name = value`
    Assign {
        name: Token,
        value: Box<Expr>,
        id: ExprId,
    },

    /// Infix binary operator expression, e.g. `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑, method‑ or class‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        keyword: Token,
        method: Token,
        id: ExprId,
    },

    /// The `this` keyword inside a method.
    This { keyword: Token, id: ExprId },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Prefix `!` or `-`.
    Unary { operator: Token, right: Box<Expr> },

    /// Variable access.
    Variable { name: Token, id: ExprId },
}
