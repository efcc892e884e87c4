use std::sync::Arc;

use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::error::{ParseError, convert_pest_error};
use crate::parser::{
    BinaryOp, BoolOp, ComparisonOp, Expr, ExprKind, Literal, Program, Span, Statement, UnaryOp,
};

type PestError = pest::error::Error<Rule>;

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::ternary_op, Assoc::Right))   // `? :`

        // Logical operators.
        .op(Op::infix(Rule::or, Assoc::Left))            // `||`
        .op(Op::infix(Rule::and, Assoc::Left))           // `&&`

        // Comparison operators.
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left)
        )                                               // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )                                               // `<`, `<=`, `>`, `>=`

        // Arithmetic operators.
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                               // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                               // `*`, `/`, `%`
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::not)) // `-`, `!`

        // Postfix operators.
        .op(
            Op::postfix(Rule::call_op) |
            Op::postfix(Rule::index_op) |
            Op::postfix(Rule::field_op)
        )                                               // `()`, `[]`, `.`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/script.pest"]
pub struct ScriptParser;

/// Parse a fragment of standard syntax into a program without running it.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_program(source).map_err(|err| convert_pest_error(err, source))
}

fn parse_program(source: &str) -> Result<Program, PestError> {
    let mut pairs = ScriptParser::parse(Rule::main, source)?;
    let main = pairs.next().ok_or_else(|| {
        pest::error::Error::new_from_pos(
            pest::error::ErrorVariant::CustomError {
                message: "missing expected pair in rule".to_string(),
            },
            pest::Position::from_start(source),
        )
    })?;

    let statements = main
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(parse_statement)
        .collect::<Result<_, _>>()?;

    Ok(Program { statements })
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement, PestError> {
    let span = Span::from(pair.as_span());
    match pair.as_rule() {
        Rule::throw_stmt => {
            let value = parse_expr(nth_inner(&pair, 1)?)?;
            Ok(Statement::Throw { value, span })
        }
        Rule::declaration => {
            let name = nth_inner(&pair, 1)?.as_str().to_string();
            let value = parse_expr(nth_inner(&pair, 2)?)?;
            Ok(Statement::Declare { name, value, span })
        }
        Rule::assignment => {
            let name = nth_inner(&pair, 0)?.as_str().to_string();
            let value = parse_expr(nth_inner(&pair, 1)?)?;
            Ok(Statement::Assign { name, value, span })
        }
        Rule::expression => Ok(Statement::Expr(parse_expr(pair)?)),
        rule => Err(custom_error(
            &format!("Unhandled statement rule: {:?}", rule),
            pair.as_span(),
        )),
    }
}

pub fn parse_expr(pair: Pair<Rule>) -> Result<Expr, PestError> {
    let span = Span::from(pair.as_span());
    match pair.as_rule() {
        Rule::expression => PRATT_PARSER
            .map_primary(parse_expr)
            .map_prefix(|op, rhs| {
                let rhs = rhs?;
                let span = Span::new(op.as_span().start(), rhs.span.0.end);
                let op = match op.as_rule() {
                    Rule::neg => UnaryOp::Neg,
                    Rule::not => UnaryOp::Not,
                    _ => unreachable!("Unknown prefix operator: {:?}", op.as_rule()),
                };
                Ok(Expr::new(
                    ExprKind::Unary {
                        op,
                        expr: Box::new(rhs),
                    },
                    span,
                ))
            })
            .map_infix(|lhs, op, rhs| {
                let (lhs, rhs) = (lhs?, rhs?);
                let span = Span::combine(&lhs.span, &rhs.span);
                let (left, right) = (Box::new(lhs), Box::new(rhs));
                let kind = match op.as_rule() {
                    Rule::add => binary(BinaryOp::Add, left, right),
                    Rule::sub => binary(BinaryOp::Sub, left, right),
                    Rule::mul => binary(BinaryOp::Mul, left, right),
                    Rule::div => binary(BinaryOp::Div, left, right),
                    Rule::rem => binary(BinaryOp::Rem, left, right),
                    Rule::and => ExprKind::Boolean {
                        op: BoolOp::And,
                        left,
                        right,
                    },
                    Rule::or => ExprKind::Boolean {
                        op: BoolOp::Or,
                        left,
                        right,
                    },
                    Rule::eq => comparison(ComparisonOp::Eq, left, right),
                    Rule::ne => comparison(ComparisonOp::Neq, left, right),
                    Rule::lt => comparison(ComparisonOp::Lt, left, right),
                    Rule::le => comparison(ComparisonOp::Le, left, right),
                    Rule::gt => comparison(ComparisonOp::Gt, left, right),
                    Rule::ge => comparison(ComparisonOp::Ge, left, right),
                    Rule::ternary_op => {
                        let then_branch = parse_expr(nth_inner(&op, 0)?)?;
                        ExprKind::If {
                            cond: left,
                            then_branch: Box::new(then_branch),
                            else_branch: right,
                        }
                    }
                    _ => unreachable!("Unknown binary operator: {:?}", op.as_rule()),
                };
                Ok(Expr::new(kind, span))
            })
            .map_postfix(|lhs, op| {
                let lhs = lhs?;
                let span = Span::new(lhs.span.0.start, op.as_span().end());
                let kind = match op.as_rule() {
                    Rule::call_op => {
                        let args = op.into_inner().map(parse_expr).collect::<Result<_, _>>()?;
                        ExprKind::Call {
                            callable: Box::new(lhs),
                            args,
                        }
                    }
                    Rule::index_op => {
                        let index = parse_expr(nth_inner(&op, 0)?)?;
                        ExprKind::Index {
                            value: Box::new(lhs),
                            index: Box::new(index),
                        }
                    }
                    Rule::field_op => {
                        let field = nth_inner(&op, 0)?.as_str().to_string();
                        ExprKind::Field {
                            value: Box::new(lhs),
                            field,
                        }
                    }
                    _ => unreachable!("Unknown postfix operator: {:?}", op.as_rule()),
                };
                Ok(Expr::new(kind, span))
            })
            .parse(pair.into_inner()),

        Rule::lambda => {
            let mut inner = pair.clone().into_inner();
            let params = inner
                .next()
                .ok_or_else(|| custom_error("missing lambda parameters", pair.as_span()))?
                .into_inner()
                .map(|p| p.as_str().to_string())
                .collect();
            let body = parse_expr(
                inner
                    .next()
                    .ok_or_else(|| custom_error("missing lambda body", pair.as_span()))?,
            )?;
            Ok(Expr::new(
                ExprKind::Lambda {
                    params,
                    body: Arc::new(body),
                },
                span,
            ))
        }

        Rule::array => {
            let items = pair
                .into_inner()
                .map(parse_expr)
                .collect::<Result<_, _>>()?;
            Ok(Expr::new(ExprKind::Array(items), span))
        }

        Rule::object => {
            let entries = pair
                .into_inner()
                .map(parse_object_member)
                .collect::<Result<_, _>>()?;
            Ok(Expr::new(ExprKind::Object(entries), span))
        }

        Rule::number => {
            let text = pair.as_str();
            let is_float = text.contains(['.', 'e', 'E']);
            let literal = match text.parse::<i64>() {
                Ok(value) if !is_float => Literal::Int(value),
                _ => Literal::Float(text.parse().map_err(|_| {
                    custom_error("invalid number literal", pair.as_span())
                })?),
            };
            Ok(Expr::new(ExprKind::Literal(literal), span))
        }

        Rule::string => {
            let value = parse_string(&pair)?;
            Ok(Expr::new(ExprKind::Literal(Literal::Str(value)), span))
        }

        Rule::boolean => {
            let value = match pair.as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(custom_error("invalid boolean literal", pair.as_span())),
            };
            Ok(Expr::new(ExprKind::Literal(Literal::Bool(value)), span))
        }

        Rule::null => Ok(Expr::new(ExprKind::Literal(Literal::Null), span)),

        Rule::grouped => parse_expr(nth_inner(&pair, 0)?),

        Rule::ident => Ok(Expr::new(ExprKind::Ident(pair.as_str().to_string()), span)),

        _ => Err(custom_error(
            &format!("Unhandled rule: {:?}", pair.as_rule()),
            pair.as_span(),
        )),
    }
}

fn parse_object_member(pair: Pair<Rule>) -> Result<(String, Expr), PestError> {
    match pair.as_rule() {
        Rule::property => {
            let key_pair = nth_inner(&pair, 0)?;
            let key = match key_pair.as_rule() {
                Rule::string => parse_string(&key_pair)?,
                _ => key_pair.as_str().to_string(),
            };
            let value = parse_expr(nth_inner(&pair, 1)?)?;
            Ok((key, value))
        }
        Rule::shorthand => {
            let ident = nth_inner(&pair, 0)?;
            let name = ident.as_str().to_string();
            let value = Expr::new(ExprKind::Ident(name.clone()), Span::from(ident.as_span()));
            Ok((name, value))
        }
        rule => Err(custom_error(
            &format!("Unhandled object member: {:?}", rule),
            pair.as_span(),
        )),
    }
}

fn parse_string(pair: &Pair<Rule>) -> Result<String, PestError> {
    let chars = nth_inner(pair, 0)?;
    unescape(chars.as_str()).map_err(|message| custom_error(message, chars.as_span()))
}

/// Decode backslash escapes inside a string literal body.
fn unescape(raw: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('0') => out.push('\0'),
            Some('x') => out.push(hex_escape(&mut chars, 2)?),
            Some('u') => out.push(hex_escape(&mut chars, 4)?),
            // Unknown escapes stand for the character itself, so `\'` and `\\` work too.
            Some(other) => out.push(other),
            None => return Err("dangling escape at end of string"),
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, &'static str> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err("truncated escape sequence");
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or("invalid escape sequence")
}

fn binary(op: BinaryOp, left: Box<Expr>, right: Box<Expr>) -> ExprKind {
    ExprKind::Binary { op, left, right }
}

fn comparison(op: ComparisonOp, left: Box<Expr>, right: Box<Expr>) -> ExprKind {
    ExprKind::Comparison { op, left, right }
}

fn nth_inner<'i>(pair: &Pair<'i, Rule>, n: usize) -> Result<Pair<'i, Rule>, PestError> {
    pair.clone()
        .into_inner()
        .nth(n)
        .ok_or_else(|| custom_error("missing expected pair in rule", pair.as_span()))
}

fn custom_error(message: &str, span: pest::Span<'_>) -> PestError {
    pest::error::Error::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.to_string(),
        },
        span,
    )
}
