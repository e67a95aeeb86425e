//! All error-related TGQ types. `spec.md` §7.
//!
//! Ported from the teacher's `SourceError`/`WithSource` split
//! (`crates/core/src/error.rs`): every compile error knows how to render a
//! short diagnostic message, and a [WithSource] wrapper pairs a batch of
//! those with the originating source text so they can be displayed with a
//! `^^^^` highlight under the offending line.

use crate::{types::TypeError, util};
use std::fmt::{self, Debug, Display, Formatter};
use thiserror::Error;

/// A trait for any error that originates in source code.
pub trait SourceError: Debug {
    /// A simple type label for this error, e.g. `"Syntax"` or `"Type"`.
    fn type_label(&self) -> &'static str;

    /// True if compilation can continue after this error is reported
    /// (`spec.md` §7: type/name errors are diagnosed and generation
    /// continues; parse/relocation errors are fatal).
    fn is_warning(&self) -> bool {
        false
    }

    /// Format this error into a simple message. `spanned_src` is the slice
    /// of source code that corresponds to this error's span.
    fn fmt_msg(&self, f: &mut Formatter<'_>, spanned_src: &str) -> fmt::Result;
}

/// All errors the compiler pipeline can report. `spec.md` §7 groups these
/// into parse/type/name/emission/relocation categories; they share one enum
/// here because they also share one source-span-aware rendering path.
#[derive(Debug, Error, Clone)]
pub enum CompileError {
    /// Unexpected token, expected-type-not-found, or a bad declaration
    /// shape. Always fatal.
    #[error("expected {expected}")]
    Syntax { expected: &'static str },
    /// Unexpected end of input where a token was required.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    /// Unknown type name at a declaration site. The declaration is dropped
    /// and generation continues.
    #[error("unknown type `{name}`")]
    UnknownType { name: String },
    /// Redefinition of a name already bound in the same scope. The
    /// offending symbol is not inserted; generation continues.
    #[error("`{name}` is already defined in this scope")]
    Redefinition { name: String, original: util::Span },
    /// Reference to a name with no visible binding.
    #[error("undefined symbol `{name}`")]
    UndefinedSymbol { name: String },
    /// A binary/unary operand type mismatch. `spec.md` §7 calls for these to
    /// be surfaced as fatal, rather than the original's silent fallthrough.
    #[error(transparent)]
    Type(#[from] TypeError),
    /// `gen_reg_local`-equivalent: unsupported payload during data-buffer
    /// materialization.
    #[error("cannot materialize a value of this type: {reason}")]
    Emit { reason: String },
    /// A relocation's target label was never defined.
    #[error("label {id} was referenced but never defined")]
    UndefinedLabel { id: u32 },
    /// A relocation referenced a label id that was never allocated.
    #[error("label id {id} is out of range")]
    LabelOutOfRange { id: u32 },
}

impl SourceError for CompileError {
    fn type_label(&self) -> &'static str {
        match self {
            Self::Syntax { .. } | Self::UnexpectedEof { .. } => "Syntax",
            Self::UnknownType { .. } | Self::Redefinition { .. } => "Name",
            Self::Type(_) => "Type",
            Self::UndefinedSymbol { .. } => "Name",
            Self::Emit { .. } => "Emission",
            Self::UndefinedLabel { .. } | Self::LabelOutOfRange { .. } => {
                "Relocation"
            }
        }
    }

    fn is_warning(&self) -> bool {
        matches!(self, Self::UnknownType { .. } | Self::Redefinition { .. })
    }

    fn fmt_msg(&self, f: &mut Formatter<'_>, spanned_src: &str) -> fmt::Result {
        match self {
            Self::Syntax { expected } => write!(f, "Expected {}", expected),
            Self::UnexpectedEof { expected } => {
                write!(f, "Unexpected end of input, expected {}", expected)
            }
            Self::UnknownType { name } => {
                write!(f, "Unknown type `{}`", name)
            }
            Self::Redefinition {
                name,
                original: original_span,
            } => write!(
                f,
                "`{}` is already defined, originally on line {}",
                name, original_span.start_line
            ),
            Self::UndefinedSymbol { name } => {
                write!(f, "Undefined reference to `{}`", name)
            }
            Self::Type(type_err) => write!(f, "{} (`{}`)", type_err, spanned_src),
            Self::Emit { reason } => write!(f, "{}", reason),
            Self::UndefinedLabel { id } => {
                write!(f, "Label {} referenced but never defined", id)
            }
            Self::LabelOutOfRange { id } => {
                write!(f, "Label id {} is out of range", id)
            }
        }
    }
}

/// A wrapper around a [SourceError] that also holds the [util::Span] that
/// caused it and the offending chunk of source code, so it can be formatted
/// on its own.
#[derive(Clone, Debug)]
pub struct SourceErrorWrapper<E: SourceError> {
    error: E,
    span: util::Span,
    spanned_source: String,
}

impl<E: SourceError> SourceErrorWrapper<E> {
    pub fn new(error: E, span: util::Span, src: &str) -> Self {
        Self {
            error,
            span,
            spanned_source: span.get_source_slice(src).into(),
        }
    }

    pub fn span(&self) -> util::Span {
        self.span
    }

    pub fn error(&self) -> &E {
        &self.error
    }
}

impl<E: SourceError> Display for SourceErrorWrapper<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error at {}:{}: ",
            self.error.type_label(),
            self.span.start_line,
            self.span.start_col,
        )?;
        self.error.fmt_msg(f, &self.spanned_source)?;
        Ok(())
    }
}

/// A batch of errors, paired with the source code they came from so they can
/// render source highlights via the alternate (`{:#}`) format.
#[derive(Clone, Debug)]
pub struct WithSource<E: SourceError> {
    errors: Vec<SourceErrorWrapper<E>>,
    source_code: String,
}

impl<E: SourceError> WithSource<E> {
    pub fn new(
        errors: impl IntoIterator<Item = SourceErrorWrapper<E>>,
        source: String,
    ) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            source_code: source,
        }
    }

    pub fn errors(&self) -> &[SourceErrorWrapper<E>] {
        &self.errors
    }
}

impl<E: SourceError> Display for WithSource<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
            if f.alternate() {
                util::fmt_src_highlights(f, &error.span, &self.source_code)?;
            }
        }
        Ok(())
    }
}

impl<E: SourceError + 'static> std::error::Error for WithSource<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Span;

    #[test]
    fn test_error_wrapper_display() {
        let span = Span::new(0, 1, 3, 5, 3, 6);
        let err = SourceErrorWrapper::new(
            CompileError::UndefinedSymbol {
                name: "foo".into(),
            },
            span,
            "int a;\nint b;\nfoo;\n",
        );
        let rendered = err.to_string();
        assert!(rendered.contains("Name error at 3:5"));
        assert!(rendered.contains("foo"));
    }

    #[test]
    fn test_warning_vs_fatal() {
        assert!(CompileError::UnknownType { name: "X".into() }.is_warning());
        assert!(!CompileError::Syntax { expected: "identifier" }.is_warning());
    }
}
