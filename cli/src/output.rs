//! Printing evaluation outcomes.

use std::io::{self, Write};

use nu_ansi_term::{Color, Style};
use rebl::{Outcome, Value};

use crate::config::Options;

/// How outcomes are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Indented, optionally colored.
    Pretty { colors: bool },
    /// Indented JSON.
    Json,
    /// Compact JSON.
    Raw,
    /// One compact JSON document per line; sequences print one line per row.
    Stream,
}

impl Format {
    /// `stream` beats `raw`, which beats `json`.
    pub fn from_options(options: &Options, is_terminal: bool) -> Self {
        if options.stream {
            Format::Stream
        } else if options.raw {
            Format::Raw
        } else if options.json {
            Format::Json
        } else {
            Format::Pretty {
                colors: options.colors && is_terminal,
            }
        }
    }

    pub fn colors(self) -> bool {
        matches!(self, Format::Pretty { colors: true })
    }
}

/// Write `outcome` to `out`. Empty outcomes print nothing.
pub fn write_outcome(format: Format, outcome: Outcome, out: &mut dyn Write) -> io::Result<()> {
    match (format, outcome) {
        (_, Outcome::Empty) => Ok(()),
        (Format::Stream, Outcome::Sequence(rows)) => {
            for row in &rows {
                writeln!(out, "{}", compact(row)?)?;
            }
            Ok(())
        }
        (format, outcome) => {
            let Some(value) = outcome.into_value() else {
                return Ok(());
            };
            let text = match format {
                Format::Pretty { colors } => {
                    let mut text = String::new();
                    pretty(&value, colors, 0, &mut text);
                    text
                }
                Format::Json => serde_json::to_string_pretty(&value).map_err(io::Error::other)?,
                Format::Raw | Format::Stream => compact(&value)?,
            };
            writeln!(out, "{}", text)
        }
    }
}

fn compact(value: &Value) -> io::Result<String> {
    serde_json::to_string(value).map_err(io::Error::other)
}

const INDENT: &str = "  ";

fn paint(colors: bool, style: Style, text: &str, out: &mut String) {
    if colors {
        out.push_str(&style.paint(text).to_string());
    } else {
        out.push_str(text);
    }
}

/// JSON-shaped, two-space indented, with strings, numbers and literals
/// colored apart.
fn pretty(value: &Value, colors: bool, depth: usize, out: &mut String) {
    match value {
        Value::Null => paint(colors, Style::new().fg(Color::DarkGray), "null", out),
        Value::Bool(b) => paint(colors, Style::new().fg(Color::Magenta), &b.to_string(), out),
        Value::Int(_) | Value::Float(_) => {
            let text = serde_json::to_string(value).unwrap_or_else(|_| value.to_string());
            paint(colors, Style::new().fg(Color::Yellow), &text, out)
        }
        Value::Str(s) => {
            let text = serde_json::to_string(s).unwrap_or_else(|_| format!("{:?}", s));
            paint(colors, Style::new().fg(Color::Green), &text, out)
        }
        Value::Function(_) | Value::Query(_) => {
            paint(colors, Style::new().fg(Color::Cyan), &value.to_string(), out)
        }
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                push_indent(depth + 1, out);
                pretty(item, colors, depth + 1, out);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(depth, out);
            out.push(']');
        }
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Object(fields) => {
            out.push_str("{\n");
            for (i, (key, item)) in fields.iter().enumerate() {
                push_indent(depth + 1, out);
                let key = serde_json::to_string(key).unwrap_or_else(|_| format!("{:?}", key));
                paint(colors, Style::new().bold(), &key, out);
                out.push_str(": ");
                pretty(item, colors, depth + 1, out);
                if i + 1 < fields.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(depth, out);
            out.push('}');
        }
    }
}

fn push_indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
