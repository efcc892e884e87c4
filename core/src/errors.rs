//! Errors reported by one evaluation.
//!
//! There are exactly two kinds: [`CompileError`] when the text never got to
//! run, and [`RuntimeError`] for anything that failed afterwards, including
//! database failures while resolving a query.

use core::fmt;

use thiserror::Error;

use crate::parser::Span;
use crate::query::{DriverError, QueryError};
use crate::values::{ConversionError, Value};

/// Failure of a single evaluation call.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl EvalError {
    /// Whether more input could turn this into a valid program.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, EvalError::Compile(err) if err.is_incomplete())
    }
}

/// The text could not be turned into an executable unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The alternate syntax could not be rewritten into the standard one.
    /// The span points into `text`, the original input.
    #[error("{message}")]
    Transpile {
        label: String,
        text: String,
        span: Span,
        message: String,
    },

    /// The standard syntax did not parse. When `translated` is set, `text` is
    /// the transpiler output rather than what the user typed.
    #[error("{message}")]
    Syntax {
        label: String,
        text: String,
        span: Span,
        message: String,
        incomplete: bool,
        translated: bool,
    },
}

impl CompileError {
    pub fn label(&self) -> &str {
        match self {
            CompileError::Transpile { label, .. } | CompileError::Syntax { label, .. } => label,
        }
    }

    /// The text the span refers to.
    pub fn text(&self) -> &str {
        match self {
            CompileError::Transpile { text, .. } | CompileError::Syntax { text, .. } => text,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            CompileError::Transpile { span, .. } | CompileError::Syntax { span, .. } => span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Transpile { message, .. } | CompileError::Syntax { message, .. } => {
                message
            }
        }
    }

    /// The parser ran out of input, so a caller may ask for more lines.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            CompileError::Syntax {
                incomplete: true,
                ..
            }
        )
    }
}

/// A failure once code is running, with the call stack at the point it was raised.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Innermost frame first. Empty for database failures.
    pub stack: Vec<StackFrame>,
}

#[derive(Debug, Clone, Error)]
pub enum RuntimeErrorKind {
    #[error("{name} is not defined")]
    Undefined { name: String },

    #[error("TypeError: {message}")]
    Type { message: String },

    #[error("TypeError: {callee} is not a function")]
    NotCallable { callee: String },

    #[error("Uncaught {}", .0.to_text())]
    Thrown(Value),

    #[error("{0}")]
    QueryBuild(#[from] QueryError),

    #[error("{0}")]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Driver(DriverError),

    #[error("{0}")]
    Drain(DriverError),

    #[error("evaluation stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, stack: Vec<StackFrame>) -> Self {
        Self { kind, stack }
    }

    /// A database failure; these happen outside evaluated code and have no stack.
    pub fn driver(err: DriverError) -> Self {
        Self::new(RuntimeErrorKind::Driver(err), Vec::new())
    }

    pub fn drain(err: DriverError) -> Self {
        Self::new(RuntimeErrorKind::Drain(err), Vec::new())
    }

    /// The message followed by one `at ...` line per frame.
    pub fn stack_trace(&self) -> String {
        let mut out = self.kind.to_string();
        for frame in &self.stack {
            out.push_str("\n    ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

/// One entry of a runtime stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// `None` for top-level code.
    pub function: Option<String>,
    pub label: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(function) => write!(
                f,
                "at {} ({}:{}:{})",
                function, self.label, self.line, self.column
            ),
            None => write!(f, "at {}:{}:{}", self.label, self.line, self.column),
        }
    }
}
