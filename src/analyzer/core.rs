use thiserror::Error;

use crate::tokenizer::token::Span;

/// A parser over a slice of `I` starting at `pos`, yielding the next position and a value.
pub trait Parser<I, O> {
    fn parse(&self, input: &[I], pos: usize) -> ParseResult<O>;
}

pub type ParseResult<O> = Result<(usize, O), ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span}: {message}, found {found}")]
    ParseError {
        message: String,
        found: String,
        span: Span,
    },
    #[error("unclosed tag <{name}> opened at {span}")]
    UnclosedTag { name: String, span: Span },
    #[error("mismatched tag at {span}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected EOF")]
    UnexpectedEOF,
    #[error("EOF")]
    EOF,
    #[error("Unexpected")]
    Unexpected,
    #[error("Fail: {0}")]
    Fail(String),
    #[error("{message}: {inner}")]
    WithContext {
        message: String,
        inner: Box<ParseError>,
    },
}

impl ParseError {
    /// The innermost error beneath any context layers.
    pub fn root_cause(&self) -> &ParseError {
        match self {
            ParseError::WithContext { inner, .. } => inner.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_context() {
        let error = ParseError::WithContext {
            message: "document".to_string(),
            inner: Box::new(ParseError::WithContext {
                message: "element".to_string(),
                inner: Box::new(ParseError::EOF),
            }),
        };
        assert_eq!(error.root_cause(), &ParseError::EOF);
        assert_eq!(error.to_string(), "document: element: EOF");
    }
}
