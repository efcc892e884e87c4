use std::sync::Arc;

use crate::parser::{BinaryOp, BoolOp, ComparisonOp, Span, UnaryOp};

/// A parsed input fragment: a sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A bare expression; its value becomes the program's value when last.
    Expr(Expr),
    /// `name = value`, evaluates to the assigned value.
    Assign { name: String, value: Expr, span: Span },
    /// `let name = value`, evaluates to nothing.
    Declare { name: String, value: Expr, span: Span },
    /// `throw value`
    Throw { value: Expr, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Boolean {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Call {
        callable: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Field {
        value: Box<Expr>,
        field: String,
    },
    Lambda {
        params: Vec<String>,
        body: Arc<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}
