//! One test per boundary scenario enumerated for the compiler pipeline:
//! constant folding into the data buffer, struct layout, expression
//! precedence, for-loop desugaring, vector constructors, and the
//! `==`/`= =` tokenization distinction.

use tgq::ast::{Decl, Expr, Qualifier, Stmt};
use tgq::token::{filter_comments, Lexer, TokenKind};
use tgq::Compiler;

fn parse(src: &str) -> tgq::ast::Program {
    let tokens = filter_comments(Lexer::new(src).tokenize());
    tgq::parse::Parser::new(&tokens).parse_program().unwrap()
}

#[test]
fn test_const_int_declaration() {
    let program = parse("const int N = 42;");
    match program.decls[0].value() {
        Decl::Variable(v) => {
            assert!(v.qualifiers.contains(&Qualifier::Const));
            assert_eq!(v.type_name, "int");
            assert_eq!(v.name, "N");
            match v.initializer.as_deref().unwrap().value() {
                Expr::Literal(lit) => assert_eq!(lit, "42"),
                other => panic!("expected literal initializer, got {:?}", other),
            }
        }
        other => panic!("expected variable decl, got {:?}", other),
    }

    let compiled = Compiler::compile("const int N = 42;".to_string()).unwrap();
    assert_eq!(compiled.data(), &[0x2a, 0x00, 0x00, 0x00]);
}

#[test]
fn test_struct_field_layout() {
    let compiled = Compiler::compile("struct S { int a; float b; }; S s;".to_string());
    assert!(compiled.is_ok());
}

#[test]
fn test_binary_precedence_nests_multiplication_inside_addition() {
    let program = parse("int r = a + b * c;");
    let init = match program.decls[0].value() {
        Decl::Variable(v) => v.initializer.as_deref().unwrap().value().clone(),
        other => panic!("expected variable decl, got {:?}", other),
    };
    match init {
        Expr::Binary { op, left, right } => {
            assert_eq!(op, "+");
            assert!(matches!(left.value(), Expr::Identifier(n) if n == "a"));
            match right.value() {
                Expr::Binary { op, left, right } => {
                    assert_eq!(op, "*");
                    assert!(matches!(left.value(), Expr::Identifier(n) if n == "b"));
                    assert!(matches!(right.value(), Expr::Identifier(n) if n == "c"));
                }
                other => panic!("expected nested multiplication, got {:?}", other),
            }
        }
        other => panic!("expected top-level addition, got {:?}", other),
    }
}

#[test]
fn test_for_loop_ast_shape() {
    let program = parse("void f() { for (int i = 0; i < 10; i = i + 1) { } }");
    let body = match program.decls[0].value() {
        Decl::Function(f) => &f.body.value().stmts,
        other => panic!("expected function decl, got {:?}", other),
    };
    match body[0].value() {
        Stmt::For {
            init,
            test,
            update,
            ..
        } => {
            match init.as_deref().unwrap().value() {
                Stmt::VarDecl(v) => {
                    assert_eq!(v.name, "i");
                    assert_eq!(v.type_name, "int");
                }
                other => panic!("expected var decl init, got {:?}", other),
            }
            match test.as_deref().unwrap().value() {
                Expr::Binary { op, .. } => assert_eq!(op, "<"),
                other => panic!("expected comparison test, got {:?}", other),
            }
            match update.as_deref().unwrap().value() {
                Expr::Assignment { op, .. } => assert_eq!(op, "="),
                other => panic!("expected assignment update, got {:?}", other),
            }
        }
        other => panic!("expected for-statement, got {:?}", other),
    }
}

#[test]
fn test_vec3_constructor_three_float_args() {
    let program = parse("vec3 v = vec3(1.0, 2.0, 3.0);");
    match program.decls[0].value() {
        Decl::Variable(v) => {
            assert_eq!(v.type_name, "vec3");
            match v.initializer.as_deref().unwrap().value() {
                Expr::Constructor { type_name, args } => {
                    assert_eq!(type_name, "vec3");
                    assert_eq!(args.len(), 3);
                    for (arg, expected) in args.iter().zip(["1.0", "2.0", "3.0"]) {
                        assert!(matches!(arg.value(), Expr::Literal(l) if l == expected));
                    }
                }
                other => panic!("expected constructor, got {:?}", other),
            }
        }
        other => panic!("expected variable decl, got {:?}", other),
    }
}

#[test]
fn test_double_equals_is_one_token_single_equals_space_is_two() {
    let eq_eq = filter_comments(Lexer::new("==").tokenize());
    assert_eq!(eq_eq.len(), 2); // operator token + EOF
    assert_eq!(eq_eq[0].kind, TokenKind::Operator);
    assert_eq!(eq_eq[0].lexeme, "==");

    let eq_space_eq = filter_comments(Lexer::new("= =").tokenize());
    assert_eq!(eq_space_eq.len(), 3); // two operator tokens + EOF
    assert_eq!(eq_space_eq[0].lexeme, "=");
    assert_eq!(eq_space_eq[1].lexeme, "=");
}
