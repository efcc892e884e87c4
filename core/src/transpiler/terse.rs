use core::ops::Range;

use crate::transpiler::lexer::{KEYWORDS, TERSE_KEYWORDS, Token, tokenize};

/// Why the alternate syntax could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileError {
    pub span: Range<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    /// An explicit bracket. `object` is set when an implicit `{` was opened right after it.
    Bracket { closer: Token, object: bool },
    /// A call opened by juxtaposition (`f x`), closed implicitly.
    Call { object: bool },
}

/// Rewrite alternate-syntax text into standard syntax.
///
/// Whitespace and comments are copied through, so line numbers survive.
pub fn transpile(source: &str) -> Result<String, TranspileError> {
    let tokens = tokenize(source).map_err(|err| TranspileError {
        span: err.span,
        message: err.message,
    })?;

    let mut rewriter = Rewriter {
        source,
        tokens,
        out: String::with_capacity(source.len() + 8),
        stack: Vec::new(),
        last: None,
    };
    rewriter.run()?;
    Ok(rewriter.out)
}

struct Rewriter<'a> {
    source: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    out: String,
    stack: Vec<Frame>,
    /// Last token that was not whitespace or a comment, as written to `out`.
    last: Option<Token>,
}

impl Rewriter<'_> {
    fn run(&mut self) -> Result<(), TranspileError> {
        let source = self.source;
        let mut i = 0;
        while i < self.tokens.len() {
            let (token, span) = self.tokens[i].clone();
            let text = &source[span.clone()];

            match token {
                Token::Space | Token::LineComment | Token::BlockComment => self.out.push_str(text),
                Token::HashComment => {}
                Token::Newline => {
                    if !self.continues_line() {
                        self.close_calls();
                    }
                    self.out.push('\n');
                }
                Token::Semi => {
                    self.close_calls();
                    self.emit(";", token);
                }
                Token::LParen | Token::LBracket | Token::LBrace => {
                    let in_call_position = matches!(self.last, Some(Token::Ident | Token::RParen));
                    self.emit(text, token);
                    let object = token == Token::LParen
                        && in_call_position
                        && self.object_starts_at(i + 1);
                    if object {
                        self.out.push('{');
                    }
                    if let Some(closer) = token.closer() {
                        self.stack.push(Frame::Bracket { closer, object });
                    }
                }
                Token::RParen | Token::RBracket | Token::RBrace => {
                    self.close_calls();
                    match self.stack.pop() {
                        Some(Frame::Bracket { closer, object }) if closer == token => {
                            if object {
                                self.out.push('}');
                            }
                            self.emit(text, token);
                        }
                        _ => {
                            return Err(TranspileError {
                                span,
                                message: format!("unmatched `{}`", text),
                            });
                        }
                    }
                }
                Token::Comma => {
                    self.emit(",", token);
                    let plain_call = matches!(self.stack.last(), Some(Frame::Call { object: false }));
                    if plain_call && self.object_starts_at(i + 1) {
                        self.out.push_str(" {");
                        if let Some(Frame::Call { object }) = self.stack.last_mut() {
                            *object = true;
                        }
                    }
                }
                Token::ThinArrow => {
                    if self.last == Some(Token::RParen) {
                        self.emit("=>", Token::FatArrow);
                    } else {
                        self.emit("() =>", Token::FatArrow);
                    }
                }
                Token::Ident => {
                    let (replacement, as_token) = match text {
                        "and" => ("&&", Token::Operator),
                        "or" => ("||", Token::Operator),
                        "not" => ("!", Token::Operator),
                        "is" => ("==", Token::Operator),
                        "isnt" => ("!=", Token::Operator),
                        "yes" | "on" => ("true", Token::Ident),
                        "no" | "off" => ("false", Token::Ident),
                        _ => (text, Token::Ident),
                    };
                    self.emit(replacement, as_token);

                    if is_callee(text) && self.call_follows(i) {
                        // The separating space becomes the opening paren.
                        self.out.push('(');
                        let object = self.object_starts_at(i + 2);
                        if object {
                            self.out.push('{');
                        }
                        self.stack.push(Frame::Call { object });
                        self.last = Some(Token::LParen);
                        i += 1;
                    }
                }
                Token::Str
                | Token::Number
                | Token::Colon
                | Token::Dot
                | Token::Question
                | Token::FatArrow
                | Token::Operator => self.emit(text, token),
            }
            i += 1;
        }

        self.close_calls();
        Ok(())
    }

    fn emit(&mut self, text: &str, token: Token) {
        self.out.push_str(text);
        self.last = Some(token);
    }

    /// Close implicit calls back to the innermost explicit bracket.
    fn close_calls(&mut self) {
        while let Some(Frame::Call { object }) = self.stack.last().copied() {
            self.stack.pop();
            if object {
                self.out.push('}');
            }
            self.out.push(')');
        }
    }

    /// A newline after these tokens does not end an implicit call.
    fn continues_line(&self) -> bool {
        matches!(
            self.last,
            Some(
                Token::Comma
                    | Token::Operator
                    | Token::Colon
                    | Token::Question
                    | Token::Dot
                    | Token::FatArrow
                    | Token::ThinArrow
                    | Token::LParen
                    | Token::LBracket
                    | Token::LBrace
            )
        )
    }

    fn peek(&self, index: usize) -> Option<(Token, &str)> {
        self.tokens
            .get(index)
            .map(|(token, span)| (*token, &self.source[span.clone()]))
    }

    /// Index of the first token at or after `index` that is not a space.
    fn skip_spaces(&self, mut index: usize) -> usize {
        while let Some((Token::Space, _)) = self.peek(index) {
            index += 1;
        }
        index
    }

    /// `f x`: a single run of spaces, then something that can start an argument.
    fn call_follows(&self, index: usize) -> bool {
        let Some((Token::Space, _)) = self.peek(index + 1) else {
            return false;
        };
        let Some((token, text)) = self.peek(index + 2) else {
            return false;
        };
        match token {
            Token::Ident => !matches!(text, "and" | "or" | "is" | "isnt"),
            Token::Number
            | Token::Str
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::ThinArrow => true,
            // `f -x` is a call, `f - x` is a subtraction.
            Token::Operator if text == "-" || text == "!" => {
                matches!(self.peek(index + 3), Some((next, _)) if !next.is_trivia() && next != Token::Newline)
            }
            _ => false,
        }
    }

    /// `key: value` starting at `index`, with the colon right after the key.
    fn object_starts_at(&self, index: usize) -> bool {
        let key = self.skip_spaces(index);
        match self.peek(key) {
            Some((Token::Ident, text)) if !is_reserved(text) => {}
            Some((Token::Str, _)) => {}
            _ => return false,
        }
        matches!(self.peek(key + 1), Some((Token::Colon, _)))
    }
}

fn is_reserved(word: &str) -> bool {
    KEYWORDS.contains(&word) || TERSE_KEYWORDS.contains(&word)
}

fn is_callee(word: &str) -> bool {
    !is_reserved(word)
}
