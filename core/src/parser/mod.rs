mod parsed_expr;
pub mod parser;
mod syntax;
pub mod error;

// Re-export the parser and rule enum for external use
pub use parser::ScriptParser;
pub use parser::Rule;
pub use parser::parse;

pub use parsed_expr::{Expr, ExprKind, Literal, Program, Statement};
pub use syntax::{BinaryOp, BoolOp, ComparisonOp, Source, Span, UnaryOp};
pub use error::{ParseError, ParseErrorKind};

#[cfg(test)]
mod parse_test;
