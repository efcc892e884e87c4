//! Error rendering using ariadne
//!
//! Compile errors are shown as an annotated snippet of the input they came
//! from. Runtime errors have no single span worth pointing at, so they are
//! shown as a message followed by their stack.

use crate::{CompileError, EvalError, RuntimeError};
use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with colors to stderr
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use rebl::{Context, Evaluator, render_error};
/// use rebl::query::MemoryConnection;
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # runtime.block_on(async {
/// let mut context = Context::new(Arc::new(MemoryConnection::new("test")));
/// if let Err(e) = Evaluator::new().evaluate("1 + + ]", &mut context, "repl").await {
///     render_error(&e);
/// }
/// # });
/// ```
pub fn render_error(error: &EvalError) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
///
/// This is useful when you want to control where the error is written,
/// such as to a file, a buffer, or a custom output stream.
pub fn render_error_to(error: &EvalError, writer: &mut dyn Write, use_color: bool) -> std::io::Result<()> {
    render_error_to_writer(error, writer, use_color)
}

/// Render an error to a String, with colors.
pub fn render_error_to_string(error: &EvalError) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
///
/// This is the same as `render_error_to_string` but without ANSI color codes,
/// making the output easier to compare in tests.
pub fn render_error_to_string_no_color(error: &EvalError) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &EvalError,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        EvalError::Compile(err) => render_compile_error(err, writer, use_color),
        EvalError::Runtime(err) => render_runtime_error(err, writer, use_color),
    }
}

fn render_compile_error(
    error: &CompileError,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let label = error.label();
    let text = error.text();

    // Errors at the very end of the input carry an empty span past the last
    // character; keep it inside the text so the snippet still renders.
    let start = error.span().0.start.min(text.len());
    let end = error.span().0.end.clamp(start, text.len());

    let note = match error {
        CompileError::Transpile { .. } => Some("while rewriting the alternate syntax"),
        CompileError::Syntax {
            translated: true, ..
        } => Some("the snippet shows the input after rewriting the alternate syntax"),
        CompileError::Syntax { .. } => None,
    };

    let mut report = Report::build(ReportKind::Error, (label, start..end))
        .with_message(error.message())
        .with_config(
            Config::default()
                .with_color(use_color)
                .with_index_type(IndexType::Byte),
        )
        .with_label(
            Label::new((label, start..end))
                .with_message(error.message())
                .with_color(Color::Red),
        );
    if let Some(note) = note {
        report = report.with_note(note);
    }

    report.finish().write((label, Source::from(text)), &mut *writer)
}

fn render_runtime_error(
    error: &RuntimeError,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    if use_color {
        writeln!(writer, "{} {}", "Error:".fg(Color::Red), error.kind)?;
    } else {
        writeln!(writer, "Error: {}", error.kind)?;
    }
    for frame in &error.stack {
        if use_color {
            writeln!(writer, "    {}", frame.fg(Color::Fixed(244)))?;
        } else {
            writeln!(writer, "    {}", frame)?;
        }
    }
    Ok(())
}
