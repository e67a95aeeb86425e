//! Character stream → token stream. See `spec.md` §4.1.
//!
//! The lexer is total: every byte of input produces some token, even if
//! that token is a one-byte operator nobody asked for. There is no
//! `LexError`.

use crate::{
    consts::{BUILTIN_TYPES, KEYWORDS, TWO_CHAR_OPERATORS},
    util::Span,
};

/// The kind of a [Token]. Carries no payload; the lexeme text lives
/// alongside it on the `Token` itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Type,
    Identifier,
    Number,
    String,
    Operator,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    Comment,
    Eof,
}

/// A single lexed token: its kind, its literal text, and where it came from.
/// Tokens are immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

/// Scans a byte sequence into a flat [Token] stream, the final element of
/// which is always a [TokenKind::Eof] sentinel.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Run the lexer to completion, producing every token including the
    /// trailing EOF sentinel.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn position(&self) -> (usize, usize, usize) {
        (self.pos, self.line, self.col)
    }

    fn span_from(&self, start: (usize, usize, usize)) -> Span {
        Span::new(start.0, self.pos - start.0, start.1, start.2, self.line, self.col)
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.position();
        let c = match self.peek() {
            None => return Token::new(TokenKind::Eof, "", self.span_from(start)),
            Some(c) => c,
        };

        if c == b'/' && self.peek_at(1) == Some(b'/') {
            return self.lex_line_comment(start);
        }
        if c == b'/' && self.peek_at(1) == Some(b'*') {
            return self.lex_block_comment(start);
        }
        if c == b'"' || c == b'\'' {
            return self.lex_string(start, c);
        }
        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if is_ident_start(c) {
            return self.lex_identifier(start);
        }
        if let Some(kind) = single_char_punct(c) {
            self.advance();
            return Token::new(kind, (c as char).to_string(), self.span_from(start));
        }
        self.lex_operator(start)
    }

    fn lex_line_comment(&mut self, start: (usize, usize, usize)) -> Token {
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.advance();
        }
        let lexeme = self.slice_from(start.0);
        Token::new(TokenKind::Comment, lexeme, self.span_from(start))
    }

    fn lex_block_comment(&mut self, start: (usize, usize, usize)) -> Token {
        self.advance(); // '/'
        self.advance(); // '*'
        loop {
            match self.peek() {
                None => break, // unterminated-at-EOF is tolerated
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let lexeme = self.slice_from(start.0);
        Token::new(TokenKind::Comment, lexeme, self.span_from(start))
    }

    fn lex_string(&mut self, start: (usize, usize, usize), quote: u8) -> Token {
        self.advance(); // opening quote
        loop {
            match self.peek() {
                None => break,
                Some(b'\\') => {
                    self.advance();
                    self.advance(); // pass the escaped char through unexamined
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let lexeme = self.slice_from(start.0);
        Token::new(TokenKind::String, lexeme, self.span_from(start))
    }

    fn lex_number(&mut self, start: (usize, usize, usize)) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.')
            && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
        {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'f') | Some(b'F')) {
            self.advance();
        }
        let lexeme = self.slice_from(start.0);
        Token::new(TokenKind::Number, lexeme, self.span_from(start))
    }

    fn lex_identifier(&mut self, start: (usize, usize, usize)) -> Token {
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.advance();
        }
        let lexeme = self.slice_from(start.0);
        let kind = if KEYWORDS.contains(&lexeme.as_str()) {
            TokenKind::Keyword
        } else if BUILTIN_TYPES.contains(&lexeme.as_str()) {
            TokenKind::Type
        } else {
            TokenKind::Identifier
        };
        Token::new(kind, lexeme, self.span_from(start))
    }

    fn lex_operator(&mut self, start: (usize, usize, usize)) -> Token {
        let first = self.advance().unwrap();
        if let Some(second) = self.peek() {
            let pair = [first, second];
            let pair_str = std::str::from_utf8(&pair).unwrap();
            if TWO_CHAR_OPERATORS.contains(&pair_str) {
                self.advance();
                return Token::new(
                    TokenKind::Operator,
                    pair_str,
                    self.span_from(start),
                );
            }
        }
        Token::new(
            TokenKind::Operator,
            (first as char).to_string(),
            self.span_from(start),
        )
    }

    fn slice_from(&self, start_pos: usize) -> String {
        String::from_utf8_lossy(&self.src[start_pos..self.pos]).into_owned()
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn single_char_punct(c: u8) -> Option<TokenKind> {
    Some(match c {
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b';' => TokenKind::Semicolon,
        b',' => TokenKind::Comma,
        b'.' => TokenKind::Dot,
        _ => return None,
    })
}

/// Filters comments out of a token stream, the way the teacher's parser
/// works only over the "filtered token stream" (`spec.md` §4.2).
pub fn filter_comments(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().iter().map(|t| t.kind).collect()
    }

    fn lexemes(src: &str) -> Vec<String> {
        Lexer::new(src)
            .tokenize()
            .iter()
            .map(|t| t.lexeme.clone())
            .collect()
    }

    #[test]
    fn test_eof_sentinel() {
        let toks = Lexer::new("").tokenize();
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Eof);
    }

    #[test]
    fn test_two_char_operator_greedy() {
        assert_eq!(lexemes("=="), vec!["==", ""]);
        assert_eq!(lexemes("= ="), vec!["=", "=", ""]);
    }

    #[test]
    fn test_keyword_vs_type_vs_identifier() {
        let toks = Lexer::new("if vec3 foo").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(toks[1].kind, TokenKind::Type);
        assert_eq!(toks[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn test_number_with_fraction_and_suffix() {
        let toks = Lexer::new("1.0f 42").tokenize();
        assert_eq!(toks[0].lexeme, "1.0f");
        assert_eq!(toks[1].lexeme, "42");
    }

    #[test]
    fn test_unterminated_block_comment_tolerated() {
        let toks = Lexer::new("/* never closes").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Comment);
        assert_eq!(toks[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unknown_char_becomes_operator() {
        let toks = Lexer::new("@").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Operator);
        assert_eq!(toks[0].lexeme, "@");
    }

    #[test]
    fn test_idempotent_relex() {
        let src = "int a = 1 + 2;";
        let first: Vec<_> = Lexer::new(src)
            .tokenize()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect();
        // Re-lexing the concatenation of lexemes (minus EOF) should yield the
        // same kind/lexeme sequence, i.e. lexing is idempotent.
        let rejoined = first
            .iter()
            .take(first.len() - 1)
            .map(|(_, l)| l.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second: Vec<_> = Lexer::new(&rejoined)
            .tokenize()
            .into_iter()
            .map(|t| (t.kind, t.lexeme))
            .collect();
        assert_eq!(kinds_only(&first), kinds_only(&second));
        fn kinds_only(v: &[(TokenKind, String)]) -> Vec<TokenKind> {
            v.iter().map(|(k, _)| *k).collect()
        }
    }

    #[test]
    fn test_filter_comments() {
        let toks = Lexer::new("int a; // hi\n").tokenize();
        let filtered = filter_comments(toks);
        assert!(filtered.iter().all(|t| t.kind != TokenKind::Comment));
    }
}
