//! rebl - an interactive shell for building and running document database
//! queries
//!
//! # Overview
//!
//! Each input fragment is compiled, run against a persistent [`Context`] and,
//! when the run produced a query, resolved against the context's connection.
//! The caller gets back exactly one [`Outcome`] or one [`EvalError`] per
//! fragment.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use rebl::{Context, Evaluator, Outcome, Value};
//! use rebl::query::MemoryConnection;
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let mut context = Context::new(Arc::new(MemoryConnection::new("test")));
//! let evaluator = Evaluator::new();
//!
//! evaluator.evaluate("(r.tableCreate('bikes')\n)", &mut context, "repl").await.unwrap();
//! evaluator
//!     .evaluate("(r.table('bikes').insert({id: 1, brand: 'Scott'})\n)", &mut context, "repl")
//!     .await
//!     .unwrap();
//!
//! let outcome = evaluator.evaluate("(r.table('bikes').count()\n)", &mut context, "repl").await.unwrap();
//! assert_eq!(outcome, Outcome::Resolved(Value::Int(1)));
//! # });
//! ```
//!
//! # Alternate Syntax
//!
//! Setting the context's alternate-syntax flag makes the compiler accept a
//! terser, whitespace-sensitive syntax (`and`/`or`/`is`, `->` functions,
//! calls without parentheses) which it rewrites to the standard one first.

pub use rebl_core::{
    Compile, CompileError, Context, EvalError, Evaluator, EvaluatorOptions, Outcome,
    RuntimeError, RuntimeErrorKind, ScriptCompiler, StackFrame, Unit, Value,
};
pub use rebl_core::{compiler, context, evaluator, query, transpiler, values};

pub mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
