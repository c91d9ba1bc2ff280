//! SQL syntax errors.

use std::fmt;

use crate::error::ErrorKind;

/// A byte range in the source SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset from the start of the input.
    pub start: usize,
    /// Byte offset of the end of the span (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a zero-length span at the given position.
    pub fn at(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// A statement that could not be parsed, with the offending position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Creates an error for a token other than the one the grammar requires.
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::new(format!("expected {expected}, found {found}"), span)
    }

    /// Returns the 1-based character position for error reporting.
    pub fn position(&self) -> usize {
        self.span.start + 1
    }

    /// Syntax errors are always the caller's fault.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error: {} at position {}",
            self.message,
            self.position()
        )
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_position() {
        let err = SyntaxError::new("test", Span::at(10));
        assert_eq!(err.position(), 11);
    }

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::unexpected_token("identifier", "keyword 'TABLE'", Span::new(5, 10));
        assert_eq!(
            err.to_string(),
            "syntax error: expected identifier, found keyword 'TABLE' at position 6"
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
