//! Token lexer shared by the alternate-syntax transpiler and the CLI highlighter.
//!
//! Whitespace and comments are real tokens here so the transpiler can copy
//! them through and keep the rewritten text laid out like the input.

use core::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[regex(r"[ \t\r\f]+")]
    Space,

    #[token("\n")]
    Newline,

    /// Alternate syntax only.
    #[regex(r"#[^\n]*")]
    HashComment,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[regex(r#""(?:[^"\\\n]|\\.)*""#)]
    #[regex(r#"'(?:[^'\\\n]|\\.)*'"#)]
    Str,

    #[regex(r"[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token("?")]
    Question,

    #[token("->")]
    ThinArrow,

    #[token("=>")]
    FatArrow,

    #[regex(r"===|!==|==|!=|<=|>=|&&|\|\||[-+*/%<>=!]")]
    Operator,
}

/// Words the standard syntax reserves.
pub const KEYWORDS: &[&str] = &[
    "let",
    "var",
    "const",
    "throw",
    "true",
    "false",
    "null",
    "undefined",
];

/// Words that only mean something in the alternate syntax.
pub const TERSE_KEYWORDS: &[&str] = &[
    "and", "or", "not", "is", "isnt", "yes", "no", "on", "off",
];

impl Token {
    pub fn is_opener(self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    pub fn is_closer(self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }

    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Token::Space | Token::HashComment | Token::LineComment | Token::BlockComment
        )
    }

    /// The closer that balances this opener.
    pub fn closer(self) -> Option<Token> {
        match self {
            Token::LParen => Some(Token::RParen),
            Token::LBracket => Some(Token::RBracket),
            Token::LBrace => Some(Token::RBrace),
            _ => None,
        }
    }
}

/// A lexing failure at `span`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Range<usize>,
    pub message: String,
}

/// Split `source` into tokens with their byte ranges.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, LexError> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(lex_error(source, span)),
        })
        .collect()
}

fn lex_error(source: &str, span: Range<usize>) -> LexError {
    let rest = &source[span.start..];
    match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let end = rest.find('\n').map_or(source.len(), |i| span.start + i);
            LexError {
                span: span.start..end,
                message: format!("unterminated string literal (missing closing {})", quote),
            }
        }
        Some('/') if rest.starts_with("/*") => LexError {
            span: span.start..source.len(),
            message: "unterminated block comment".to_string(),
        },
        Some(c) => LexError {
            span: span.start..span.start + c.len_utf8(),
            message: format!("unexpected character `{}`", c),
        },
        None => LexError {
            span,
            message: "unexpected end of input".to_string(),
        },
    }
}
