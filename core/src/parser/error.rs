use crate::parser::{Rule, Span};

/// Parser error with the offending location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    /// The parser ran out of input while it still expected more.
    pub at_end: bool,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken { expected: String, found: String },
    /// Invalid literal or other custom parser failure
    Other { message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, at_end: bool) -> Self {
        Self { kind, span, at_end }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                format!("Expected {}, found {}", expected, found)
            }
            ParseErrorKind::Other { message } => message.clone(),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ParseError {}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };
    let at_end = span.0.start >= source.trim_end().len();

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            let expected = format_expected_rules(&positives);
            let found = if at_end {
                "end of input".to_string()
            } else {
                format_found(&negatives, source, &span)
            };
            ParseErrorKind::UnexpectedToken { expected, found }
        }
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, span, at_end)
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    // Group related rules into higher-level concepts
    let mut concepts = Vec::new();
    let mut note = |concept: &'static str| {
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    };

    for rule in rules {
        match rule {
            Rule::number | Rule::string | Rule::boolean | Rule::null => note("literal"),
            Rule::ident | Rule::name => note("identifier"),
            Rule::EOI => note("end of input"),
            Rule::ternary_op
            | Rule::or
            | Rule::and
            | Rule::eq
            | Rule::ne
            | Rule::le
            | Rule::ge
            | Rule::lt
            | Rule::gt
            | Rule::add
            | Rule::sub
            | Rule::mul
            | Rule::div
            | Rule::rem => note("operator"),
            Rule::call_op | Rule::index_op | Rule::field_op => note("call or member access"),
            _ => note("expression"),
        }
    }

    if concepts.len() == 1 {
        concepts[0].to_string()
    } else {
        let last = concepts.pop().unwrap_or("expression");
        format!("{} or {}", concepts.join(", "), last)
    }
}

/// Describe what sits at the error position.
fn format_found(rules: &[Rule], source: &str, span: &Span) -> String {
    if let Some(rule) = rules.first() {
        return format!("{:?}", rule);
    }
    match source[span.0.start..].chars().next() {
        Some('\n') => "end of line".to_string(),
        Some(c) => {
            let word: String = source[span.0.start..]
                .chars()
                .take_while(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '$')
                .collect();
            if word.is_empty() {
                format!("'{}'", c)
            } else {
                format!("'{}'", word)
            }
        }
        None => "end of input".to_string(),
    }
}
