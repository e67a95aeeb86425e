//! Black-box tests for programs that fail during parsing. All of these
//! should abort compilation with a single fatal `Syntax` diagnostic.

use tgq::error::SourceError;
use tgq::Compiler;

fn compile_err(src: &str) -> String {
    Compiler::compile(src.to_string())
        .unwrap_err()
        .to_string()
}

#[test]
fn test_missing_identifier_after_type() {
    let msg = compile_err("int ;");
    assert!(msg.contains("Syntax error"), "{}", msg);
}

#[test]
fn test_unterminated_declaration() {
    let msg = compile_err("int a = 5");
    assert!(msg.contains("Syntax error"), "{}", msg);
}

#[test]
fn test_bad_expression_statement() {
    let msg = compile_err("int = ;");
    assert!(msg.contains("Syntax error"), "{}", msg);
}

#[test]
fn test_unclosed_block() {
    let msg = compile_err("void f() {");
    assert!(msg.contains("Syntax error") || msg.contains("end of input"), "{}", msg);
}

#[test]
fn test_parse_error_is_single_and_fatal() {
    let err = Compiler::compile("int = ;".to_string()).unwrap_err();
    assert_eq!(err.errors().len(), 1);
    assert!(!err.errors()[0].error().is_warning());
}

#[test]
fn test_undefined_symbol_is_not_a_warning() {
    let err = Compiler::compile("void f() { x = 1; }".to_string()).unwrap_err();
    assert!(!err.errors()[0].error().is_warning());
}

#[test]
fn test_type_mismatch_is_not_a_warning() {
    let err =
        Compiler::compile("void f() { vec3 a; vec4 b; a + b; }".to_string()).unwrap_err();
    assert!(!err.errors()[0].error().is_warning());
}
