//! Turns input text into an executable [`Unit`].
//!
//! Compilation only validates and parses; nothing runs until the unit is
//! handed to the interpreter. The surface syntax is picked once, at entry, by
//! selecting a [`Frontend`].
//!
//! ## Example
//!
//! ```
//! use rebl_core::compiler::{Compile, ScriptCompiler};
//!
//! let unit = ScriptCompiler.compile("(1 +\n 1\n)", false, "repl").unwrap();
//! assert_eq!(unit.source.text, "1 +\n 1\n");
//! assert_eq!(unit.program.statements.len(), 1);
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::CompileError;
use crate::parser::{self, Program, Source, Span};
use crate::transpiler;

#[cfg(test)]
mod compile_test;

/// One compiled input fragment, ready to run.
#[derive(Debug)]
pub struct Unit {
    /// Standard-syntax text the program's spans point into.
    pub source: Arc<Source>,
    pub program: Program,
}

/// Anything that can compile input text into a [`Unit`].
pub trait Compile {
    fn compile(&self, text: &str, alternate_syntax: bool, label: &str)
    -> Result<Unit, CompileError>;
}

/// How raw input becomes standard syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frontend {
    Standard,
    Terse,
}

impl Frontend {
    pub fn select(alternate_syntax: bool) -> Self {
        if alternate_syntax {
            Frontend::Terse
        } else {
            Frontend::Standard
        }
    }

    /// Produce standard-syntax text.
    pub fn to_standard<'a>(self, text: &'a str, label: &str) -> Result<Cow<'a, str>, CompileError> {
        match self {
            Frontend::Standard => Ok(Cow::Borrowed(text)),
            Frontend::Terse => {
                let standard =
                    transpiler::transpile(text).map_err(|err| CompileError::Transpile {
                        label: label.to_string(),
                        text: text.to_string(),
                        span: Span(err.span),
                        message: err.message,
                    })?;
                trace!(%standard, "Transpiled alternate syntax");
                Ok(Cow::Owned(standard))
            }
        }
    }
}

/// The compiler for the script language and its alternate syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptCompiler;

impl Compile for ScriptCompiler {
    fn compile(
        &self,
        text: &str,
        alternate_syntax: bool,
        label: &str,
    ) -> Result<Unit, CompileError> {
        let text = strip_wrapping(text);
        let frontend = Frontend::select(alternate_syntax);
        debug!(?frontend, label, "Compiling");

        let standard = frontend.to_standard(text, label)?;
        let program = parser::parse(&standard).map_err(|err| CompileError::Syntax {
            label: label.to_string(),
            text: standard.to_string(),
            span: err.span.clone(),
            message: err.message(),
            incomplete: err.at_end,
            translated: frontend == Frontend::Terse,
        })?;

        Ok(Unit {
            source: Source::new(label, standard.into_owned()),
            program,
        })
    }
}

/// Remove one leading `(` and one trailing `)` when both are present.
///
/// Sessions wrap every fragment in parentheses so a fragment may span lines;
/// this undoes exactly that wrapping. It does not balance brackets, so text
/// like `(1) + (2)` must be wrapped before it is handed over.
pub fn strip_wrapping(text: &str) -> &str {
    text.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(text)
}

/// Whether `text` is a wrapped fragment with nothing but whitespace inside.
pub fn is_empty_fragment(text: &str) -> bool {
    text.strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .is_some_and(|inner| inner.trim().is_empty())
}
