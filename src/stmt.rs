use std::rc::Rc;

use serde::Serialize;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration.  Shared behind an `Rc` because every
/// function value created from it (closures, bound methods) keeps it alive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    pub body: Vec<Stmt>,
}

/// Every kind of *statement* in Fox.  A program is a sequence of these.
/// `for` loops do not appear here: the parser desugars them into `While`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    While { condition: Expr, body: Box<Stmt> },
}
