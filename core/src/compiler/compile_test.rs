use pretty_assertions::assert_eq;

use super::*;
use crate::parser::Statement;

#[test]
fn test_strip_wrapping_is_single_and_paired() {
    assert_eq!(strip_wrapping("(1 + 1\n)"), "1 + 1\n");
    assert_eq!(strip_wrapping("((1))"), "(1)");
    assert_eq!(strip_wrapping("(1"), "(1");
    assert_eq!(strip_wrapping("1)"), "1)");
    assert_eq!(strip_wrapping("1 + 1"), "1 + 1");
    assert_eq!(strip_wrapping(""), "");
}

#[test]
fn test_unpaired_wrapping_is_left_alone() {
    // Only a matched pair is session wrapping. A lone `(` stays, so the text
    // reads as an unfinished group.
    let err = ScriptCompiler.compile("(1\n", false, "repl").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }), "{:?}", err);
    assert!(err.is_incomplete(), "{:?}", err);

    // A trailing `)` that closes a group inside the text is not stripped.
    let unit = ScriptCompiler.compile("1 + (2)", false, "repl").unwrap();
    assert_eq!(unit.source.text, "1 + (2)");
}

#[test]
fn test_empty_fragment() {
    assert!(is_empty_fragment("(\n)"));
    assert!(is_empty_fragment("()"));
    assert!(is_empty_fragment("(  \n\t)"));
    assert!(!is_empty_fragment("(x\n)"));
    assert!(!is_empty_fragment(""));
    assert!(!is_empty_fragment("\n"));
}

#[test]
fn test_compile_standard() {
    let unit = ScriptCompiler.compile("(x = 5\n)", false, "repl").unwrap();
    assert_eq!(unit.source.label, "repl");
    assert!(matches!(
        &unit.program.statements[..],
        [Statement::Assign { name, .. }] if name == "x"
    ));
}

#[test]
fn test_compile_terse_only_with_flag() {
    let text = "(1 is 1\n)";
    let err = ScriptCompiler.compile(text, false, "repl").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { translated: false, .. }));
    assert!(!err.is_incomplete());

    let unit = ScriptCompiler.compile(text, true, "repl").unwrap();
    assert_eq!(unit.source.text, "1 == 1\n");
}

#[test]
fn test_transpile_failure_keeps_original_text() {
    let err = ScriptCompiler.compile("f x)", true, "repl").unwrap_err();
    let CompileError::Transpile { text, span, .. } = &err else {
        panic!("expected a transpile error, got {:?}", err);
    };
    assert_eq!(text, "f x)");
    assert_eq!(span, &Span(3..4));
}

#[test]
fn test_incomplete_input() {
    let err = ScriptCompiler.compile("(r.table('bikes').filter(\n)", false, "repl").unwrap_err();
    assert!(err.is_incomplete(), "{:?}", err);

    let err = ScriptCompiler.compile("(1 +\n)", true, "repl").unwrap_err();
    assert!(err.is_incomplete(), "{:?}", err);
    assert!(matches!(err, CompileError::Syntax { translated: true, .. }));
}

#[test]
fn test_compile_does_not_run_anything() {
    // An undefined name is only a problem at run time.
    assert!(ScriptCompiler.compile("undefinedThing()", false, "repl").is_ok());
}
