//! The alternate ("terse") surface syntax.
//!
//! Terse input is rewritten token by token into standard syntax, which is the
//! only syntax the parser understands.

pub mod lexer;
mod terse;

pub use terse::{TranspileError, transpile};
