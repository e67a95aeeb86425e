//! Core implementation of the TGQ shading-language compiler. A source
//! program is lexed, parsed, and walked into a TGQ bytecode program: a code
//! buffer and a data buffer. See the library-level example below for the
//! full pipeline.
//!
//! ```
//! use tgq::Compiler;
//!
//! let source = "const int N = 42;".to_string();
//! let compiled = Compiler::compile(source).unwrap();
//! assert_eq!(compiled.data(), &[0x2a, 0x00, 0x00, 0x00]);
//! ```

#![deny(clippy::all)]

pub mod ast;
pub mod codegen;
mod consts;
pub mod emit;
pub mod error;
pub mod isa;
pub mod label;
pub mod parse;
pub mod symtab;
pub mod token;
pub mod types;
pub mod util;

pub use consts::{EMIT_BUFFER_INITIAL_CAPACITY, MAX_LABELS, MAX_RELOCATIONS};
pub use util::Span;

use std::fmt::Debug;

use error::{CompileError, SourceErrorWrapper, WithSource};
use log::debug;
use token::Token;

/// Drives a source program through the compiler pipeline. `T` represents the
/// program's current stage; each stage consumes `self` and returns the next,
/// so a caller can only invoke a stage's operations once its prerequisites
/// have actually run.
#[derive(Debug)]
pub struct Compiler<T: Debug> {
    source: String,
    state: T,
}

impl Compiler<()> {
    /// Run the whole pipeline: lex, parse, and generate. This is the
    /// entry point most callers want.
    pub fn compile(source: String) -> Result<Compiler<Compiled>, WithSource<CompileError>> {
        Self { source, state: () }
            .debug()
            .lex()
            .parse()?
            .debug()
            .generate()
    }
}

impl Compiler<()> {
    fn lex(self) -> Compiler<Vec<Token>> {
        let tokens = token::filter_comments(token::Lexer::new(&self.source).tokenize());
        debug!("lexed {} tokens", tokens.len());
        Compiler {
            source: self.source,
            state: tokens,
        }
    }
}

impl Compiler<Vec<Token>> {
    fn parse(self) -> Result<Compiler<ast::Program>, WithSource<CompileError>> {
        match parse::Parser::new(&self.state).parse_program() {
            Ok(program) => Ok(Compiler {
                source: self.source,
                state: program,
            }),
            Err(e) => Err(WithSource::new(
                vec![SourceErrorWrapper::new(e, Span::default(), &self.source)],
                self.source,
            )),
        }
    }

    /// The filtered token stream, for callers that only want `-t` output.
    pub fn tokens(&self) -> &[Token] {
        &self.state
    }
}

impl Compiler<ast::Program> {
    /// The parsed AST, for callers that only want `-a` output.
    pub fn program(&self) -> &ast::Program {
        &self.state
    }

    fn generate(self) -> Result<Compiler<Compiled>, WithSource<CompileError>> {
        let mut codegen = codegen::Codegen::new(self.source.clone());
        codegen.gen_program(&self.state)?;
        Ok(Compiler {
            source: self.source,
            state: Compiled {
                code: codegen.code.as_bytes().to_vec(),
                data: codegen.data.as_bytes().to_vec(),
                warnings: codegen.warnings().to_vec(),
            },
        })
    }
}

impl Compiler<Compiled> {
    pub fn code(&self) -> &[u8] {
        &self.state.code
    }

    pub fn data(&self) -> &[u8] {
        &self.state.data
    }

    pub fn warnings(&self) -> &[SourceErrorWrapper<CompileError>] {
        &self.state.warnings
    }

    pub fn disassemble(&self) -> Vec<isa::Instruction> {
        isa::disassemble(&self.state.code)
    }
}

/// The final pipeline stage: the generated code/data buffers plus any
/// non-fatal diagnostics gathered along the way.
#[derive(Debug, Clone)]
pub struct Compiled {
    code: Vec<u8>,
    data: Vec<u8>,
    warnings: Vec<SourceErrorWrapper<CompileError>>,
}

impl<T: Debug> Compiler<T> {
    /// Print the current pipeline state if debug mode is enabled. Returns
    /// `self` unchanged so it can be chained.
    fn debug(self) -> Self {
        crate::debug_dump!(eprintln!("{:?}", &self));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pipeline_const_int() {
        let compiled = Compiler::compile("const int N = 42;".to_string()).unwrap();
        assert_eq!(compiled.data(), &[0x2a, 0x00, 0x00, 0x00]);
        assert!(compiled.warnings().is_empty());
    }

    #[test]
    fn test_pipeline_surfaces_parse_error() {
        let err = Compiler::compile("int = ;".to_string()).unwrap_err();
        assert_eq!(err.errors().len(), 1);
    }

    #[test]
    fn test_pipeline_surfaces_unknown_type_warning() {
        let compiled = Compiler::compile("Widget w;".to_string()).unwrap();
        assert_eq!(compiled.warnings().len(), 1);
    }
}
