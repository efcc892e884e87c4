//! Unit tests for the interpreter.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::compiler::{Compile, ScriptCompiler};
use crate::errors::{RuntimeErrorKind, StackFrame};
use crate::query::{MemoryConnection, TermKind};
use crate::values::Function;

struct Runner {
    context: Context,
}

impl Runner {
    fn new() -> Self {
        Self {
            context: Context::new(Arc::new(MemoryConnection::new("test"))),
        }
    }

    fn run(&mut self, input: &str) -> Result<Value, RuntimeError> {
        self.run_with_limits(input, 200)
    }

    fn run_with_limits(&mut self, input: &str, max_depth: usize) -> Result<Value, RuntimeError> {
        let unit = ScriptCompiler
            .compile(input, false, "test")
            .expect("compilation failed");
        run(&unit, &mut self.context, max_depth)
    }

    fn value(&mut self, input: &str) -> Value {
        self.run(input)
            .unwrap_or_else(|e| panic!("{:?} failed: {}", input, e.stack_trace()))
    }

    fn json(&mut self, input: &str) -> serde_json::Value {
        serde_json::to_value(self.value(input)).unwrap()
    }
}

#[test]
fn test_arithmetic() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("1 + 1"), Value::Int(2));
    assert_eq!(runner.value("2 + 3 * 4"), Value::Int(14));
    assert_eq!(runner.value("(2 + 3) * 4"), Value::Int(20));
    assert_eq!(runner.value("7 / 2"), Value::Float(3.5));
    assert_eq!(runner.value("-(3 - 5)"), Value::Int(2));
    assert_eq!(runner.value("'a' + 1 + 2"), Value::from("a12"));
}

#[test]
fn test_empty_program_is_null() {
    let mut runner = Runner::new();
    assert_eq!(runner.value(""), Value::Null);
    assert_eq!(runner.value("// nothing"), Value::Null);
}

#[test]
fn test_assignment_persists_in_context() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("x = 5"), Value::Int(5));
    assert_eq!(runner.value("x + 1"), Value::Int(6));
    assert_eq!(runner.context.get("x"), Some(&Value::Int(5)));
}

#[test]
fn test_declaration_yields_nothing() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("let y = 3"), Value::Null);
    assert_eq!(runner.value("y * y"), Value::Int(9));
}

#[test]
fn test_last_statement_wins() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("a = 1; b = 2\na + b"), Value::Int(3));
}

#[test]
fn test_logic_and_conditionals() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("null || 'fallback'"), Value::from("fallback"));
    assert_eq!(runner.value("0 && undefinedName"), Value::Int(0));
    assert_eq!(runner.value("1 < 2 ? 'yes' : 'no'"), Value::from("yes"));
    assert_eq!(runner.value("!''"), Value::Bool(true));
    assert_eq!(runner.value("[1, 2] == [1, 2]"), Value::Bool(true));
    assert_eq!(runner.value("1 === 1.0"), Value::Bool(true));
}

#[test]
fn test_collections() {
    let mut runner = Runner::new();
    assert_eq!(
        runner.json("{a: 1, b: [1, 2][1], c: 'xyz'.length}"),
        json!({"a": 1, "b": 2, "c": 3})
    );
    assert_eq!(runner.value("[1, 2][5]"), Value::Null);
    assert_eq!(runner.value("({a: {b: 2}}).a.b"), Value::Int(2));
    assert_eq!(runner.value("({a: 1})['a']"), Value::Int(1));
    assert_eq!(runner.value("name = 'kim'; {name}.name"), Value::from("kim"));
}

#[test]
fn test_functions_and_closures() {
    let mut runner = Runner::new();
    runner.value("add = (a, b) => a + b");
    assert_eq!(runner.value("add(2, 3)"), Value::Int(5));
    // Missing arguments are null.
    assert_eq!(runner.value("((a, b) => b)(1)"), Value::Null);
    assert_eq!(runner.value("add(1, 2, 3)"), Value::Int(3));

    runner.value("adder = n => x => x + n");
    runner.value("add10 = adder(10)");
    assert_eq!(runner.value("add10(5)"), Value::Int(15));
}

#[test]
fn test_recursion_through_context() {
    let mut runner = Runner::new();
    runner.value("fact = n => n <= 1 ? 1 : n * fact(n - 1)");
    assert_eq!(runner.value("fact(10)"), Value::Int(3628800));
}

#[test]
fn test_functions_are_named_by_first_binding() {
    let mut runner = Runner::new();
    runner.value("square = x => x * x");
    runner.value("alias = square");
    assert_eq!(runner.value("alias").to_string(), "[Function: square]");
    assert_eq!(runner.value("x => x").to_string(), "[Function (anonymous)]");
}

#[test]
fn test_undefined_binding() {
    let mut runner = Runner::new();
    let err = runner.run("y + 1").unwrap_err();
    assert_eq!(err.to_string(), "y is not defined");
    assert_eq!(
        err.stack,
        vec![StackFrame {
            function: None,
            label: "test".to_string(),
            line: 1,
            column: 1,
        }]
    );
}

#[test]
fn test_stack_trace_through_calls() {
    let mut runner = Runner::new();
    runner.value("inner = x => x + missing");
    runner.value("outer = x =>\n  inner(x)");
    let err = runner.run("1 + outer(1)").unwrap_err();

    assert_eq!(
        err.stack_trace(),
        "missing is not defined\n    at inner (test:1:18)\n    at outer (test:2:3)\n    at test:1:5"
    );
}

#[test]
fn test_throw() {
    let mut runner = Runner::new();
    let err = runner.run("x = 1\nthrow 'boom: ' + x").unwrap_err();
    assert!(matches!(&err.kind, RuntimeErrorKind::Thrown(Value::Str(s)) if s == "boom: 1"));
    assert_eq!(err.stack[0].line, 2);
    // The binding made before the throw stays.
    assert_eq!(runner.context.get("x"), Some(&Value::Int(1)));
}

#[test]
fn test_not_callable() {
    let mut runner = Runner::new();
    runner.value("n = 3");
    let err = runner.run("n(1)").unwrap_err();
    assert_eq!(err.to_string(), "TypeError: n is not a function");

    let err = runner.run("r.tabel('x')").unwrap_err();
    assert_eq!(err.to_string(), "TypeError: r.tabel is not a function");
}

#[test]
fn test_null_property_access() {
    let mut runner = Runner::new();
    let err = runner.run("null.foo").unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: Cannot read properties of null (reading 'foo')"
    );
}

#[test]
fn test_division_by_zero_is_not_an_error() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("1 / 0").to_string(), "Infinity");
    assert_eq!(runner.value("-1 / 0").to_string(), "-Infinity");
    assert_eq!(runner.value("5 % 0").to_string(), "NaN");
    assert_eq!(runner.value("1 / 0 > 1e308"), Value::Bool(true));
}

#[test]
fn test_stack_overflow() {
    let mut runner = Runner::new();
    runner.value("loop = n => loop(n + 1)");
    let err = runner.run_with_limits("loop(0)", 50).unwrap_err();
    assert!(
        matches!(err.kind, RuntimeErrorKind::StackOverflow { max_depth: 50, .. }),
        "{}",
        err
    );
}

#[test]
fn test_queries_are_built_not_run() {
    let mut runner = Runner::new();
    let value = runner.value("r.table('bikes').filter({brand: 'Scott'}).count()");
    let Value::Query(query) = value else {
        panic!("expected a query");
    };
    assert_eq!(query.kind(), TermKind::Count);
    assert_eq!(
        query.to_string(),
        r#"r.table("bikes").filter({"brand":"Scott"}).count()"#
    );
}

#[test]
fn test_query_root_and_methods_are_functions() {
    let mut runner = Runner::new();
    assert_eq!(runner.value("r"), Value::Function(Function::QueryRoot));
    assert_eq!(runner.value("r.table").to_string(), "[Function: table]");
    assert!(matches!(runner.value("r({a: 1})"), Value::Query(q) if q.kind() == TermKind::Expr));
}

#[test]
fn test_query_build_errors_are_runtime_errors() {
    let mut runner = Runner::new();
    let err = runner.run("r.table()").unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::QueryBuild(_)));

    let err = runner.run("r.expr(x => x)").unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::Conversion(_)));
}
