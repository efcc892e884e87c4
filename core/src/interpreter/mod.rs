//! Tree-walking interpreter for compiled units.
//!
//! Top-level bindings go straight into the [`Context`], so they outlive the
//! unit that created them. Function parameters live in per-call frames and
//! are captured by value when a function is created.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rebl_core::compiler::{Compile, ScriptCompiler};
//! use rebl_core::context::Context;
//! use rebl_core::interpreter;
//! use rebl_core::query::MemoryConnection;
//! use rebl_core::values::Value;
//!
//! let mut context = Context::new(Arc::new(MemoryConnection::new("test")));
//! let unit = ScriptCompiler.compile("double = x => x * 2; double(21)", false, "repl").unwrap();
//! let result = interpreter::run(&unit, &mut context, 100).unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

mod eval;
mod operators;

#[cfg(test)]
mod eval_test;

pub use eval::Interpreter;

use crate::compiler::Unit;
use crate::context::Context;
use crate::errors::RuntimeError;
use crate::values::Value;

/// Run `unit` inside `context`, allowing at most `max_depth` nested expressions.
pub fn run(unit: &Unit, context: &mut Context, max_depth: usize) -> Result<Value, RuntimeError> {
    Interpreter::new(context, max_depth).run(unit)
}
