use super::parser::{Rule, ScriptParser};
use super::*;
use pest::Parser;
use pest::error::Error;
use pretty_assertions::assert_eq;

/// Render an expression as an s-expression, ignoring spans.
fn sexpr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(Literal::Null) => "null".to_string(),
        ExprKind::Literal(Literal::Bool(b)) => b.to_string(),
        ExprKind::Literal(Literal::Int(i)) => i.to_string(),
        ExprKind::Literal(Literal::Float(f)) => format!("{:?}", f),
        ExprKind::Literal(Literal::Str(s)) => format!("{:?}", s),
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Array(items) => {
            let items: Vec<_> = items.iter().map(sexpr).collect();
            format!("[{}]", items.join(" "))
        }
        ExprKind::Object(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(k, v)| format!("{}:{}", k, sexpr(v)))
                .collect();
            format!("{{{}}}", entries.join(" "))
        }
        ExprKind::Unary { op, expr } => {
            let op = match op {
                UnaryOp::Neg => "neg",
                UnaryOp::Not => "!",
            };
            format!("({} {})", op, sexpr(expr))
        }
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", op, sexpr(left), sexpr(right))
        }
        ExprKind::Boolean { op, left, right } => {
            let op = match op {
                BoolOp::And => "&&",
                BoolOp::Or => "||",
            };
            format!("({} {} {})", op, sexpr(left), sexpr(right))
        }
        ExprKind::Comparison { op, left, right } => {
            format!("({} {} {})", op, sexpr(left), sexpr(right))
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "(? {} {} {})",
            sexpr(cond),
            sexpr(then_branch),
            sexpr(else_branch)
        ),
        ExprKind::Call { callable, args } => {
            let mut parts = vec![sexpr(callable)];
            parts.extend(args.iter().map(sexpr));
            format!("(call {})", parts.join(" "))
        }
        ExprKind::Index { value, index } => format!("(index {} {})", sexpr(value), sexpr(index)),
        ExprKind::Field { value, field } => format!("(. {} {})", sexpr(value), field),
        ExprKind::Lambda { params, body } => {
            format!("(fn [{}] {})", params.join(" "), sexpr(body))
        }
    }
}

fn statement(stmt: &Statement) -> String {
    match stmt {
        Statement::Expr(expr) => sexpr(expr),
        Statement::Assign { name, value, .. } => format!("(= {} {})", name, sexpr(value)),
        Statement::Declare { name, value, .. } => format!("(let {} {})", name, sexpr(value)),
        Statement::Throw { value, .. } => format!("(throw {})", sexpr(value)),
    }
}

fn parse_to_sexprs(input: &str) -> Vec<String> {
    parse(input)
        .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", input, e))
        .statements
        .iter()
        .map(statement)
        .collect()
}

fn parse_one(input: &str) -> String {
    let mut statements = parse_to_sexprs(input);
    assert_eq!(statements.len(), 1, "expected a single statement in {:?}", input);
    statements.remove(0)
}

#[test]
fn test_valid_expressions() -> Result<(), Error<Rule>> {
    let examples = [
        "1 + 2",
        "a * b + c",
        "foo(1, 2, 3)",
        "[1, 2, 3]",
        "{a: 1, 'b c': 2, d}",
        "{}",
        "'\\n'",
        "\"\\u0041\"",
        "x => x + 1",
        "(a, b) => a * b",
        "() => 42",
        "a ? b : c",
        "r.table('bikes').filter({brand: 'Scott'})",
        "3.14",
        "1e-10",
        "null",
        "undefined",
        "let x = 5",
        "x = 5",
        "throw 'boom'",
        "a; b; c",
        "",
        "// just a comment",
        "/* block */ 1",
    ];

    for expr in examples {
        ScriptParser::parse(Rule::main, expr)
            .unwrap_or_else(|e| panic!("Failed to parse '{}': {}", expr, e));
    }

    Ok(())
}

#[test]
fn test_invalid_expressions() {
    let examples = [
        "1 +",
        "{a: }",
        "1 is 1",
        "a and b",
        "foo(1,, 2)",
        "[1, 2",
        "x = ",
        "let = 1",
        "'unterminated",
        "1 2",
        "()",
        "f x",
    ];

    for expr in examples {
        assert!(
            ScriptParser::parse(Rule::main, expr).is_err(),
            "Expected parse failure for '{}'",
            expr
        );
    }
}

#[test]
fn test_precedence() {
    assert_eq!(parse_one("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(parse_one("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    assert_eq!(parse_one("1 - 2 - 3"), "(- (- 1 2) 3)");
    assert_eq!(parse_one("-a.b"), "(neg (. a b))");
    assert_eq!(parse_one("!a || b && c"), "(|| (! a) (&& b c))");
    assert_eq!(parse_one("a < b == c >= d"), "(== (< a b) (>= c d))");
    assert_eq!(parse_one("a || b ? 1 : 2"), "(? (|| a b) 1 2)");
    assert_eq!(parse_one("a ? b : c ? d : e"), "(? a b (? c d e))");
    assert_eq!(parse_one("7 % 4 / 2"), "(/ (% 7 4) 2)");
}

#[test]
fn test_postfix_chains() {
    assert_eq!(
        parse_one("r.table('bikes').get(1)"),
        "(call (. (call (. r table) \"bikes\") get) 1)"
    );
    assert_eq!(parse_one("a[0][1]"), "(index (index a 0) 1)");
    assert_eq!(parse_one("f()"), "(call f)");
}

#[test]
fn test_literals() {
    assert_eq!(parse_one("42"), "42");
    assert_eq!(parse_one("4.5"), "4.5");
    assert_eq!(parse_one("2e3"), "2000.0");
    assert_eq!(parse_one("true"), "true");
    assert_eq!(parse_one("undefined"), "null");
    assert_eq!(parse_one(r#"'it\'s'"#), "\"it's\"");
    assert_eq!(parse_one(r#""tab\there""#), "\"tab\\there\"");
    assert_eq!(parse_one(r#""\x41\u0042""#), "\"AB\"");
    assert_eq!(parse_one("[1, 'a', [],]"), "[1 \"a\" []]");
    assert_eq!(parse_one("{a: 1, 'b': 2, c,}"), "{a:1 b:2 c:c}");
}

#[test]
fn test_keywords_are_not_identifiers() {
    assert!(parse("let = 3").is_err());
    assert!(parse("throw = 3").is_err());
    // ...but they are fine as property names.
    assert_eq!(parse_one("a.null"), "(. a null)");
    assert_eq!(parse_one("{let: 1}"), "{let:1}");
    assert_eq!(parse_one("lettuce"), "lettuce");
}

#[test]
fn test_lambdas() {
    assert_eq!(parse_one("x => x + 1"), "(fn [x] (+ x 1))");
    assert_eq!(parse_one("(a, b) => a * b"), "(fn [a b] (* a b))");
    assert_eq!(parse_one("() => {}"), "(fn [] {})");
    assert_eq!(parse_one("(x) => (y) => x"), "(fn [x] (fn [y] x))");
    assert_eq!(parse_one("(x)"), "x");
}

#[test]
fn test_statements() {
    assert_eq!(
        parse_to_sexprs("x = 5; let y = x\nthrow y"),
        vec!["(= x 5)", "(let y x)", "(throw y)"]
    );
    assert_eq!(parse_to_sexprs("a == b"), vec!["(== a b)"]);
    assert_eq!(parse_to_sexprs(";;\n\n1;\n"), vec!["1"]);
    assert!(parse_to_sexprs("").is_empty());
    assert!(parse_to_sexprs("  // nothing\n").is_empty());
}

#[test]
fn test_newline_continuations() {
    let chained = "r.table('bikes')\n  .filter({brand: 'Scott'})\n  .count()";
    assert_eq!(
        parse_one(chained),
        "(call (. (call (. (call (. r table) \"bikes\") filter) {brand:\"Scott\"}) count))"
    );
    assert_eq!(parse_one("[\n  1,\n  2\n]"), "[1 2]");
    assert_eq!(parse_one("1 +\n 2"), "(+ 1 2)");
    assert_eq!(parse_one("f(\n  1,\n)"), "(call f 1)");
    assert_eq!(parse_to_sexprs("a\nb"), vec!["a", "b"]);
}

#[test]
fn test_spans_cover_source() {
    let program = parse("  foo.bar(1)").unwrap();
    let Statement::Expr(expr) = &program.statements[0] else {
        panic!("expected expression statement");
    };
    assert_eq!(expr.span, Span(2..12));
}
