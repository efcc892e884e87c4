//! The calling session: owns the context and drives one evaluation at a time.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::Diagnostic;
use rebl::query::{DriverError, MemoryConnection};
use rebl::{Compile, Context, EvalError, Evaluator, Outcome, ScriptCompiler, render_error_to};
use reedline::{ValidationResult, Validator};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::Options;
use crate::output::{Format, write_outcome};

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("could not read data file {}", path.display())]
    #[diagnostic(code(rebl::data::read))]
    ReadData {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("data file {} is not valid JSON", path.display())]
    #[diagnostic(code(rebl::data::parse))]
    ParseData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not load data file {}", path.display())]
    #[diagnostic(
        code(rebl::data::seed),
        help("the file must look like {{\"db\": {{\"table\": [rows...]}}}}")
    )]
    Seed {
        path: PathBuf,
        #[source]
        source: DriverError,
    },

    #[error("could not start the async runtime")]
    #[diagnostic(code(rebl::runtime))]
    Runtime(#[source] io::Error),
}

/// Wrap a fragment the way every session hands it to the evaluator, so that
/// an empty fragment becomes the no-op `(\n)`.
pub fn wrap(fragment: &str) -> String {
    format!("({}\n)", fragment)
}

fn connect(options: &Options) -> Result<MemoryConnection, SessionError> {
    let Some(path) = &options.data else {
        return Ok(MemoryConnection::new(options.database.clone()));
    };
    let seed = load_seed(path)?;
    MemoryConnection::with_data(options.database.clone(), &seed).map_err(|source| {
        SessionError::Seed {
            path: path.clone(),
            source,
        }
    })
}

fn load_seed(path: &Path) -> Result<serde_json::Value, SessionError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SessionError::ReadData {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| SessionError::ParseData {
        path: path.to_path_buf(),
        source,
    })
}

/// One shell session.
pub struct Shell {
    runtime: Runtime,
    evaluator: Evaluator,
    context: Context,
    format: Format,
    label: &'static str,
}

impl Shell {
    pub fn new(options: &Options, format: Format, label: &'static str) -> Result<Self, SessionError> {
        let connection = connect(options)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SessionError::Runtime)?;
        let context = Context::new(Arc::new(connection)).with_alternate_syntax(options.terse);
        debug!(database = %options.database, terse = options.terse, "Session started");

        Ok(Self {
            runtime,
            evaluator: Evaluator::new(),
            context,
            format,
            label,
        })
    }

    /// Evaluate one fragment.
    pub fn evaluate(&mut self, fragment: &str) -> Result<Outcome, EvalError> {
        let text = wrap(fragment);
        self.runtime
            .block_on(self.evaluator.evaluate(&text, &mut self.context, self.label))
    }

    /// Evaluate one fragment and print its outcome to `out`, or its error to
    /// `err`. Returns whether the evaluation succeeded.
    pub fn run(&mut self, fragment: &str, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<bool> {
        match self.evaluate(fragment) {
            Ok(outcome) => {
                write_outcome(self.format, outcome, out)?;
                out.flush()?;
                Ok(true)
            }
            Err(error) => {
                render_error_to(&error, err, self.format.colors())?;
                Ok(false)
            }
        }
    }
}

/// Whether `fragment` could still become valid with more lines.
fn is_incomplete(fragment: &str, terse: bool) -> bool {
    ScriptCompiler
        .compile(&wrap(fragment), terse, "input")
        .is_err_and(|err| err.is_incomplete())
}

/// Collects piped lines into fragments: lines are added until the text is no
/// longer incomplete.
#[derive(Debug, Default)]
pub struct Accumulator {
    buffer: String,
    terse: bool,
}

impl Accumulator {
    pub fn new(terse: bool) -> Self {
        Self {
            buffer: String::new(),
            terse,
        }
    }

    /// Add a line. Returns a fragment once one is ready.
    pub fn push(&mut self, line: &str) -> Option<String> {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        if self.buffer.trim().is_empty() {
            self.buffer.clear();
            return None;
        }
        if is_incomplete(&self.buffer, self.terse) {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }

    /// Whatever is left at end of input.
    pub fn finish(self) -> Option<String> {
        (!self.buffer.trim().is_empty()).then_some(self.buffer)
    }
}

/// Asks the line editor for more lines while the input is incomplete.
pub struct InputValidator {
    terse: bool,
}

impl InputValidator {
    pub fn new(terse: bool) -> Self {
        Self { terse }
    }
}

impl Validator for InputValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if is_incomplete(line, self.terse) {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}
