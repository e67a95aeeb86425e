//! Black-box tests for programs that compile successfully but produce
//! diagnostics, and for name errors that are fatal despite being reported
//! through the same `[Warn]`-capable error family.

use tgq::Compiler;

#[test]
fn test_unknown_type_is_a_warning() {
    let compiled = Compiler::compile("Widget w;".to_string()).unwrap();
    assert_eq!(compiled.warnings().len(), 1);
    assert!(compiled.warnings()[0].to_string().contains("Unknown type"));
}

#[test]
fn test_redefinition_in_same_scope_is_a_warning() {
    let compiled = Compiler::compile("int a; int a;".to_string()).unwrap();
    assert_eq!(compiled.warnings().len(), 1);
    assert!(compiled.warnings()[0]
        .to_string()
        .contains("already defined"));
}

#[test]
fn test_redefinition_across_scopes_is_not_reported() {
    let compiled = Compiler::compile("int a; void f() { int a; }".to_string()).unwrap();
    assert!(compiled.warnings().is_empty());
}

#[test]
fn test_undefined_symbol_aborts_generation() {
    let err = Compiler::compile("void f() { x = 1; }".to_string()).unwrap_err();
    assert_eq!(err.errors().len(), 1);
    assert!(err.errors()[0].to_string().contains("Undefined reference"));
}

#[test]
fn test_multiple_unknown_types_each_reported() {
    let compiled = Compiler::compile("Widget w; Gizmo g;".to_string()).unwrap();
    assert_eq!(compiled.warnings().len(), 2);
}
