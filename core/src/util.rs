//! Small shared utilities: source spans and the debug-dump macro.

use std::fmt::{self, Formatter};

/// A (line, column) origin for a [Token](crate::token::Token) or AST node,
/// plus a byte range into the original source. `start_line`/`start_col` are
/// 1-indexed, matching the teacher's own `Span` convention.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub offset: usize,
    pub length: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(
        offset: usize,
        length: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            offset,
            length,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A zero-length span at a single position, used when a token is missing
    /// entirely (e.g. unexpected EOF).
    pub fn at(offset: usize, line: usize, col: usize) -> Self {
        Self {
            offset,
            length: 0,
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }

    /// Merge two spans into the smallest span that covers both. Used to
    /// build a span for a compound AST node from its children's spans.
    pub fn merge(&self, other: &Span) -> Span {
        let (first, second) = if self.offset <= other.offset {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            offset: first.offset,
            length: (second.offset + second.length) - first.offset,
            start_line: first.start_line,
            start_col: first.start_col,
            end_line: second.end_line,
            end_col: second.end_col,
        }
    }

    /// Slice the original source text that this span covers.
    pub fn get_source_slice<'a>(&self, src: &'a str) -> &'a str {
        let end = (self.offset + self.length).min(src.len());
        let start = self.offset.min(end);
        &src[start..end]
    }
}

/// Write a `^^^^` highlight under the offending line of source, the way the
/// teacher's `error.rs` does for `{:#}`-formatted errors.
pub fn fmt_src_highlights(
    f: &mut Formatter<'_>,
    span: &Span,
    source: &str,
) -> fmt::Result {
    if let Some(line) = source.lines().nth(span.start_line.saturating_sub(1)) {
        writeln!(f)?;
        writeln!(f, "{}", line)?;
        let marker_len = if span.end_line == span.start_line {
            (span.end_col.saturating_sub(span.start_col)).max(1)
        } else {
            1
        };
        writeln!(
            f,
            "{}{}",
            " ".repeat(span.start_col.saturating_sub(1)),
            "^".repeat(marker_len)
        )?;
    }
    Ok(())
}

/// Macro that wraps any body, and only executes the body if we are running in
/// debug mode. Debug mode is enabled by setting the environment variable
/// `DEBUG=true`. Compiles away to nothing in `--release` builds.
#[macro_export]
macro_rules! debug_dump {
    ($arg:expr) => {
        #[cfg(debug_assertions)]
        {
            if let Ok(debug_val) = std::env::var("DEBUG") {
                if debug_val.to_lowercase().as_str() == "true" {
                    $arg
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = Span::new(0, 3, 1, 1, 1, 4);
        let b = Span::new(10, 2, 1, 11, 1, 13);
        let merged = a.merge(&b);
        assert_eq!(merged, Span::new(0, 12, 1, 1, 1, 13));
    }

    #[test]
    fn test_source_slice() {
        let src = "abcdef";
        let span = Span::new(1, 3, 1, 2, 1, 5);
        assert_eq!(span.get_source_slice(src), "bcd");
    }
}
