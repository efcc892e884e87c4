//! Core of the rebl query shell: compiles input fragments, runs them against a
//! persistent [`Context`](context::Context) and resolves any database query
//! they produce into an [`Outcome`](evaluator::Outcome).

pub mod compiler;
pub mod context;
pub mod errors;
pub mod evaluator;
pub mod interpreter;
pub mod parser;
pub mod query;
pub mod transpiler;
pub mod values;

pub use compiler::{Compile, ScriptCompiler, Unit};
pub use context::Context;
pub use errors::{CompileError, EvalError, RuntimeError, RuntimeErrorKind, StackFrame};
pub use evaluator::{Evaluator, EvaluatorOptions, Outcome};
pub use values::Value;
