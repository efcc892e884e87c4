#[macro_use]
mod cases;

use cases::Session;
use rebl::{EvalError, Outcome, Value};

session_test!(
    arithmetic,
    steps: [
        ("1 + 1", 2),
        ("7 / 2", 3.5),
        ("10 % 4 * 3", 6),
        ("'n' + 1", "n1"),
    ],
);

session_test!(
    bindings_persist,
    steps: [
        ("x = 5", 5),
        ("x + 1", 6),
        ("x = x * 10", 50),
        ("x", 50),
    ],
);

session_test!(
    declarations_print_nothing,
    steps: [
        ("let total = 40", null),
        ("total + 2", 42),
    ],
);

session_test!(
    functions_across_fragments,
    steps: [
        ("square = x => x * x", "[Function: square]"),
        ("compose = (f, g) => x => f(g(x))", "[Function: compose]"),
        ("fourth = compose(square, square)", "[Function: fourth]"),
        ("fourth(3)", 81),
    ],
);

session_test!(
    multi_line_fragments,
    steps: [
        ("point = {\n  x: 1,\n  y: 2,\n}", {"x": 1, "y": 2}),
        ("[point.x,\n point.y]", [1, 2]),
    ],
);

session_test!(
    collections,
    steps: [
        ("[1, 'two', null, [3]]", [1, "two", null, [3]]),
        ("{b: 1, a: {c: true}}", {"b": 1, "a": {"c": true}}),
        ("'hello'.length", 5),
    ],
);

#[tokio::test]
async fn empty_lines_are_no_ops() {
    let mut session = Session::new(false);
    assert_eq!(session.eval("").await.unwrap(), Outcome::Empty);
    assert_eq!(session.eval("   ").await.unwrap(), Outcome::Empty);
    assert_eq!(session.eval("null").await.unwrap(), Outcome::Empty);
}

#[tokio::test]
async fn failures_keep_earlier_bindings() {
    let mut session = Session::new(false);
    assert!(session.eval("a = 1\nb = a.b.c").await.is_err());
    assert_eq!(session.context.get("a"), Some(&Value::Int(1)));
    assert_eq!(session.context.get("b"), None);
    assert_eq!(session.json("a + 1").await, serde_json::json!(2));
}

#[tokio::test]
async fn same_expression_twice() {
    let mut session = Session::new(false);
    session.eval("xs = [3, 1, 2]").await.unwrap();
    for fragment in ["xs[0] + xs[2]", "r.table('bikes').filter({brand: 'Scott'}).count()"] {
        let first = session.eval(fragment).await.unwrap();
        let second = session.eval(fragment).await.unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn compile_and_runtime_errors_are_distinct() {
    let mut session = Session::new(false);
    let err = session.eval("1 +").await.unwrap_err();
    assert!(matches!(err, EvalError::Compile(_)));
    assert!(err.is_incomplete());

    let err = session.eval("1 + ]").await.unwrap_err();
    assert!(matches!(err, EvalError::Compile(_)));
    assert!(!err.is_incomplete());

    let err = session.eval("nope + 1").await.unwrap_err();
    assert!(matches!(err, EvalError::Runtime(_)));
    assert_eq!(err.to_string(), "nope is not defined");
}
