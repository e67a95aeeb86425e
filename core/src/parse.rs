//! Filtered token stream → [ast::Program]. `spec.md` §4.2.
//!
//! Hand-rolled recursive descent, with a precedence-climbing expression
//! grammar. The teacher parses a flat assembly grammar directly with `nom`
//! combinators; this parser keeps that same "one function per grammar rule,
//! combinators compose" shape but works over a pre-lexed `&[Token]` instead
//! of raw `&str`, since the two-stage lexer/parser split this language's
//! type-aware declaration grammar needs isn't expressible as a single
//! combinator pass. Failures are `Result`s propagated with `?`, rather than
//! the original's abort-on-first-error behavior.

use crate::ast::*;
use crate::error::CompileError;
use crate::token::{Token, TokenKind};
use crate::util::Span;

type PResult<T> = Result<T, CompileError>;

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> PResult<Program> {
        let mut decls = Vec::new();
        while !self.at_eof() {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    // --- token stream primitives -------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Advance past the current token and return it. The trailing EOF
    /// sentinel is sticky: advancing past it is a no-op.
    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_lexeme(&self, lexeme: &str) -> bool {
        self.peek().lexeme == lexeme
    }

    fn eat_lexeme(&mut self, lexeme: &'static str) -> PResult<Token> {
        if self.check_lexeme(lexeme) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(lexeme))
        }
    }

    fn eat_kind(&mut self, kind: TokenKind, expected: &'static str) -> PResult<Token> {
        if self.check_kind(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> CompileError {
        if self.at_eof() {
            CompileError::UnexpectedEof { expected }
        } else {
            CompileError::Syntax { expected }
        }
    }

    // --- declarations ---------------------------------------------------

    fn parse_decl(&mut self) -> PResult<SpanNode<Decl>> {
        let start = self.peek().span;

        if self.check_lexeme("struct") {
            return self.parse_struct_decl(start);
        }
        if self.check_lexeme("precision") {
            return self.parse_precision_decl(start);
        }

        let mut qualifiers = Vec::new();
        if self.check_lexeme("const") {
            self.advance();
            qualifiers.push(Qualifier::Const);
            let type_name = self.parse_type_name()?;
            let name = self.eat_kind(TokenKind::Identifier, "identifier")?.lexeme;
            let array_len = self.parse_optional_array_len()?;
            self.eat_lexeme("=")?;
            let initializer = Some(Box::new(self.parse_expr()?));
            let end = self.eat_lexeme(";")?.span;
            return Ok(Node(
                Decl::Variable(VariableDecl {
                    qualifiers,
                    type_name,
                    name,
                    array_len,
                    initializer,
                }),
                start.merge(&end),
            ));
        }

        while let Some(q) = self.peek_qualifier() {
            qualifiers.push(q);
            self.advance();
        }

        let type_name = self.parse_type_name()?;
        let name = self.eat_kind(TokenKind::Identifier, "identifier")?.lexeme;

        if self.check_lexeme("(") {
            let params = self.parse_param_list()?;
            let body = Box::new(self.parse_block()?);
            let end = body.metadata().clone();
            return Ok(Node(
                Decl::Function(FunctionDecl {
                    qualifiers,
                    return_type: type_name,
                    name,
                    params,
                    body,
                }),
                start.merge(&end),
            ));
        }

        let array_len = self.parse_optional_array_len()?;
        let initializer = if self.check_lexeme("=") {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.eat_lexeme(";")?.span;
        Ok(Node(
            Decl::Variable(VariableDecl {
                qualifiers,
                type_name,
                name,
                array_len,
                initializer,
            }),
            start.merge(&end),
        ))
    }

    fn peek_qualifier(&self) -> Option<Qualifier> {
        match self.peek().lexeme.as_str() {
            "uniform" => Some(Qualifier::Uniform),
            "varying" => Some(Qualifier::Varying),
            "attribute" => Some(Qualifier::Attribute),
            "in" => Some(Qualifier::In),
            "out" => Some(Qualifier::Out),
            "inout" => Some(Qualifier::Inout),
            _ => None,
        }
    }

    fn parse_struct_decl(&mut self, start: Span) -> PResult<SpanNode<Decl>> {
        self.advance(); // 'struct'
        let name = self.eat_kind(TokenKind::Identifier, "struct name")?.lexeme;
        self.eat_lexeme("{")?;
        let mut fields = Vec::new();
        while !self.check_lexeme("}") {
            let type_name = self.parse_type_name()?;
            let field_name = self
                .eat_kind(TokenKind::Identifier, "field name")?
                .lexeme;
            self.eat_lexeme(";")?;
            fields.push(StructFieldDecl {
                name: field_name,
                type_name,
            });
        }
        self.advance(); // '}'
        let end = self.eat_lexeme(";")?.span;
        Ok(Node(Decl::Struct(StructDecl { name, fields }), start.merge(&end)))
    }

    /// `precision (mediump|highp|lowp) TYPE ;` lowers to a placeholder
    /// variable declaration so codegen can skip it outright (`spec.md`
    /// §4.2 item 2).
    fn parse_precision_decl(&mut self, start: Span) -> PResult<SpanNode<Decl>> {
        self.advance(); // 'precision'
        self.advance(); // mediump|highp|lowp
        let type_name = self.parse_type_name()?;
        let end = self.eat_lexeme(";")?.span;
        Ok(Node(
            Decl::Variable(VariableDecl {
                qualifiers: Vec::new(),
                type_name,
                name: "$precision".to_string(),
                array_len: None,
                initializer: None,
            }),
            start.merge(&end),
        ))
    }

    fn parse_type_name(&mut self) -> PResult<String> {
        if self.check_kind(TokenKind::Type) || self.check_kind(TokenKind::Identifier) {
            Ok(self.advance().lexeme)
        } else {
            Err(self.unexpected("type name"))
        }
    }

    fn parse_optional_array_len(&mut self) -> PResult<Option<Box<SpanNode<Expr>>>> {
        if self.check_lexeme("[") {
            self.advance();
            let len = self.parse_expr()?;
            self.eat_lexeme("]")?;
            Ok(Some(Box::new(len)))
        } else {
            Ok(None)
        }
    }

    fn parse_param_list(&mut self) -> PResult<Vec<Param>> {
        self.eat_lexeme("(")?;
        let mut params = Vec::new();
        if !self.check_lexeme(")") {
            loop {
                let type_name = self.parse_type_name()?;
                let name = self.eat_kind(TokenKind::Identifier, "parameter name")?.lexeme;
                params.push(Param { name, type_name });
                if self.check_lexeme(",") {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_lexeme(")")?;
        Ok(params)
    }

    // --- statements ------------------------------------------------------

    fn parse_block(&mut self) -> PResult<SpanNode<Block>> {
        let start = self.eat_lexeme("{")?.span;
        let mut stmts = Vec::new();
        while !self.check_lexeme("}") {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.advance().span; // '}'
        Ok(Node(Block { stmts }, start.merge(&end)))
    }

    fn parse_stmt(&mut self) -> PResult<SpanNode<Stmt>> {
        let start = self.peek().span;
        if self.check_lexeme("{") {
            let block = self.parse_block()?;
            let span = *block.metadata();
            return Ok(Node(Stmt::Block(block.0), span));
        }
        if self.check_lexeme("if") {
            return self.parse_if_stmt(start);
        }
        if self.check_lexeme("for") {
            return self.parse_for_stmt(start);
        }
        if self.check_lexeme("while") {
            return self.parse_while_stmt(start);
        }
        if self.check_lexeme("return") {
            self.advance();
            let value = if self.check_lexeme(";") {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            let end = self.eat_lexeme(";")?.span;
            return Ok(Node(Stmt::Return(value), start.merge(&end)));
        }
        if self.check_lexeme("const") || self.looks_like_decl() {
            return self.parse_local_decl_stmt(start);
        }

        let expr = self.parse_expr()?;
        let end = self.eat_lexeme(";")?.span;
        Ok(Node(Stmt::Expr(Box::new(expr)), start.merge(&end)))
    }

    /// Two-token lookahead: a declaration starts with a type name followed
    /// by an identifier, per `spec.md` §4.2's documented limitation.
    fn looks_like_decl(&self) -> bool {
        let is_type = matches!(
            self.peek().kind,
            TokenKind::Type | TokenKind::Identifier
        );
        is_type && self.peek_at(1).kind == TokenKind::Identifier
    }

    fn parse_local_decl_stmt(&mut self, start: Span) -> PResult<SpanNode<Stmt>> {
        let mut qualifiers = Vec::new();
        if self.check_lexeme("const") {
            self.advance();
            qualifiers.push(Qualifier::Const);
        }
        let type_name = self.parse_type_name()?;
        let name = self.eat_kind(TokenKind::Identifier, "identifier")?.lexeme;
        let array_len = self.parse_optional_array_len()?;
        let initializer = if self.check_lexeme("=") {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.eat_lexeme(";")?.span;
        Ok(Node(
            Stmt::VarDecl(VariableDecl {
                qualifiers,
                type_name,
                name,
                array_len,
                initializer,
            }),
            start.merge(&end),
        ))
    }

    fn parse_if_stmt(&mut self, start: Span) -> PResult<SpanNode<Stmt>> {
        self.advance(); // 'if'
        self.eat_lexeme("(")?;
        let condition = Box::new(self.parse_expr()?);
        self.eat_lexeme(")")?;
        let consequent = Box::new(self.parse_stmt()?);
        let mut end = consequent.metadata().merge(&start);
        let alternate = if self.check_lexeme("else") {
            self.advance();
            let alt = self.parse_stmt()?;
            end = end.merge(alt.metadata());
            Some(Box::new(alt))
        } else {
            None
        };
        Ok(Node(
            Stmt::If {
                condition,
                consequent,
                alternate,
            },
            end,
        ))
    }

    fn parse_for_stmt(&mut self, start: Span) -> PResult<SpanNode<Stmt>> {
        self.advance(); // 'for'
        self.eat_lexeme("(")?;

        let init = if self.check_lexeme(";") {
            self.advance();
            None
        } else {
            let stmt_start = self.peek().span;
            let stmt = if self.looks_like_decl() {
                self.parse_local_decl_stmt(stmt_start)?
            } else {
                let expr = self.parse_expr()?;
                let end = self.eat_lexeme(";")?.span;
                Node(Stmt::Expr(Box::new(expr)), stmt_start.merge(&end))
            };
            Some(Box::new(stmt))
        };

        let test = if self.check_lexeme(";") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.eat_lexeme(";")?;

        let update = if self.check_lexeme(")") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.eat_lexeme(")")?;

        let body = Box::new(self.parse_stmt()?);
        let end = body.metadata().merge(&start);
        Ok(Node(
            Stmt::For {
                init,
                test,
                update,
                body,
            },
            end,
        ))
    }

    fn parse_while_stmt(&mut self, start: Span) -> PResult<SpanNode<Stmt>> {
        self.advance(); // 'while'
        self.eat_lexeme("(")?;
        let test = Box::new(self.parse_expr()?);
        self.eat_lexeme(")")?;
        let body = Box::new(self.parse_stmt()?);
        let end = body.metadata().merge(&start);
        Ok(Node(Stmt::While { test, body }, end))
    }

    // --- expressions: precedence climbing ---------------------------------
    //
    // Level 1 (lowest) through 9 (highest), per `spec.md` §4.2. All levels
    // left-fold same-precedence chains except assignment, which recurses
    // right.

    fn parse_expr(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<SpanNode<Expr>> {
        let left = self.parse_logical_or()?;
        if matches!(self.peek().lexeme.as_str(), "=" | "+=" | "-=" | "*=" | "/=") {
            let op = self.advance().lexeme;
            let right = self.parse_assignment()?; // right-associative
            let span = left.metadata().merge(right.metadata());
            return Ok(Node(
                Expr::Assignment {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            ));
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_left_assoc_binary(&["||"], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_left_assoc_binary(&["&&"], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_left_assoc_binary(
            &["==", "!=", "<", ">", "<=", ">="],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_left_assoc_binary(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> PResult<SpanNode<Expr>> {
        self.parse_left_assoc_binary(&["*", "/", "%"], Self::parse_unary)
    }

    fn parse_left_assoc_binary(
        &mut self,
        ops: &[&str],
        mut next: impl FnMut(&mut Self) -> PResult<SpanNode<Expr>>,
    ) -> PResult<SpanNode<Expr>> {
        let mut left = next(self)?;
        while ops.contains(&self.peek().lexeme.as_str())
            && self.peek().kind == TokenKind::Operator
        {
            let op = self.advance().lexeme;
            let right = next(self)?;
            let span = left.metadata().merge(right.metadata());
            left = Node(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<SpanNode<Expr>> {
        if matches!(self.peek().lexeme.as_str(), "+" | "-" | "!" | "++" | "--")
            && self.peek().kind == TokenKind::Operator
        {
            let op_tok = self.advance();
            let operand = self.parse_unary()?;
            let span = op_tok.span.merge(operand.metadata());
            return Ok(Node(
                Expr::Unary {
                    op: op_tok.lexeme,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<SpanNode<Expr>> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check_lexeme("(") {
                let args = self.parse_arg_list()?;
                let end = self.tokens[self.pos - 1].span;
                let span = expr.metadata().merge(&end);
                expr = Node(
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.check_lexeme(".") {
                self.advance();
                let prop = self
                    .eat_kind(TokenKind::Identifier, "member name")?;
                let span = expr.metadata().merge(&prop.span);
                expr = Node(
                    Expr::Member {
                        object: Box::new(expr),
                        property: prop.lexeme,
                    },
                    span,
                );
            } else if self.check_lexeme("[") {
                self.advance();
                let index = self.parse_expr()?;
                let end = self.eat_lexeme("]")?.span;
                let span = expr.metadata().merge(&end);
                expr = Node(
                    Expr::Index {
                        container: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> PResult<Vec<SpanNode<Expr>>> {
        self.eat_lexeme("(")?;
        let mut args = Vec::new();
        if !self.check_lexeme(")") {
            loop {
                args.push(self.parse_expr()?);
                if self.check_lexeme(",") {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.eat_lexeme(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> PResult<SpanNode<Expr>> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Node(Expr::Literal(tok.lexeme), tok.span))
            }
            TokenKind::Type => {
                // built-in-type constructor: TYPE(ARGS)
                self.advance();
                let args = self.parse_arg_list()?;
                let end = self.tokens[self.pos - 1].span;
                Ok(Node(
                    Expr::Constructor {
                        type_name: tok.lexeme,
                        args,
                    },
                    tok.span.merge(&end),
                ))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Node(Expr::Identifier(tok.lexeme), tok.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.eat_lexeme(")")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
