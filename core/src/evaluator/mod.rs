//! The evaluation pipeline: compile, run, then resolve whatever the run
//! produced into an [`Outcome`].
//!
//! Every call ends in exactly one result. Compile failures and runtime
//! failures (including database failures) come back as [`EvalError`]; the
//! [`Context`] keeps any bindings made before a failure.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rebl_core::context::Context;
//! use rebl_core::evaluator::{Evaluator, Outcome};
//! use rebl_core::query::MemoryConnection;
//! use rebl_core::values::Value;
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let evaluator = Evaluator::new();
//! let mut context = Context::new(Arc::new(MemoryConnection::new("test")));
//!
//! let outcome = evaluator.evaluate("x = 20", &mut context, "repl").await.unwrap();
//! assert_eq!(outcome, Outcome::Immediate(Value::Int(20)));
//!
//! let outcome = evaluator.evaluate("r.expr(x + 1)", &mut context, "repl").await.unwrap();
//! assert_eq!(outcome, Outcome::Resolved(Value::Int(21)));
//! # });
//! ```

mod normalize;


pub use normalize::normalize;

use tracing::debug;

use crate::compiler::{self, Compile, ScriptCompiler};
use crate::context::Context;
use crate::errors::EvalError;
use crate::interpreter::Interpreter;
use crate::values::Value;

/// Default limit on nested expression evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Limits applied to each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Maximum nesting of expressions (and thus of function calls).
    pub max_depth: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The successful result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to show: the no-op fragment, a `null` result, or a query that
    /// resolved to `null`.
    Empty,
    /// A plain value produced by the run itself.
    Immediate(Value),
    /// A single value produced by running a query.
    Resolved(Value),
    /// Every row of a query's result sequence, in the order the database
    /// produced them.
    Sequence(Vec<Value>),
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Empty => "empty",
            Outcome::Immediate(_) => "immediate",
            Outcome::Resolved(_) => "resolved",
            Outcome::Sequence(_) => "sequence",
        }
    }

    /// The payload as a single value; sequences become arrays.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Empty => None,
            Outcome::Immediate(value) | Outcome::Resolved(value) => Some(value),
            Outcome::Sequence(rows) => Some(Value::Array(rows)),
        }
    }
}

/// Compiles and runs input text against a [`Context`].
#[derive(Debug, Default)]
pub struct Evaluator<C: Compile = ScriptCompiler> {
    compiler: C,
    options: EvaluatorOptions,
}

impl Evaluator<ScriptCompiler> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Compile> Evaluator<C> {
    pub fn with_compiler(compiler: C) -> Self {
        Self {
            compiler,
            options: EvaluatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Evaluate `text` inside `context`.
    ///
    /// `label` names the input in diagnostics and stack traces. Bindings the
    /// code makes stay in `context` for later calls.
    pub async fn evaluate(
        &self,
        text: &str,
        context: &mut Context,
        label: &str,
    ) -> Result<Outcome, EvalError> {
        if compiler::is_empty_fragment(text) {
            debug!(label, "Empty fragment");
            return Ok(Outcome::Empty);
        }

        let unit = self
            .compiler
            .compile(text, context.alternate_syntax(), label)?;
        debug!(label, statements = unit.program.statements.len(), "Compiled");

        let value = Interpreter::new(context, self.options.max_depth).run(&unit)?;
        debug!(label, result = value.type_name(), "Ran");

        let outcome = normalize(value, context.connection().as_ref()).await?;
        debug!(label, outcome = outcome.kind(), "Resolved");
        Ok(outcome)
    }
}
