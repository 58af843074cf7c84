use thiserror::Error;

use super::core::ParseError;
use crate::tokenizer::token::{Span, TokenizerError};

/// Why a plan text could not be turned into a [`Plan`](crate::ast::Plan).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanParseError {
    #[error(transparent)]
    Tokenize(#[from] TokenizerError),
    #[error("malformed markup: {0}")]
    Markup(#[from] ParseError),
    #[error("empty plan text")]
    EmptyInput,
    #[error("unexpected content after the document element at {span}")]
    TrailingContent { span: Span },
    #[error("document element must be <root>, found <{found}> at {span}")]
    NotRoot { found: String, span: Span },
    #[error("unknown tag <{tag}> at {span}")]
    UnknownTag { tag: String, span: Span },
    #[error("<{tag}> is not allowed inside <{parent}> at {span}")]
    MisplacedTag {
        tag: String,
        parent: String,
        span: Span,
    },
    #[error("<{tag}> is missing required attribute `{attribute}` at {span}")]
    MissingAttribute {
        tag: String,
        attribute: String,
        span: Span,
    },
    #[error("<{tag}> does not accept attribute `{attribute}` at {span}")]
    UnexpectedAttribute {
        tag: String,
        attribute: String,
        span: Span,
    },
    #[error("duplicate attribute `{attribute}` on <{tag}> at {span}")]
    DuplicateAttribute {
        tag: String,
        attribute: String,
        span: Span,
    },
    #[error("invalid {attribute}=\"{value}\" on <{tag}> at {span}: {reason}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
        reason: String,
        span: Span,
    },
    #[error("{primitive} takes no object but has obj=\"{obj}\" at {span}")]
    ObjectOnNoArgument {
        primitive: String,
        obj: String,
        span: Span,
    },
    #[error("<{tag} ID=\"{id}\"> is missing its obj attribute at {span}")]
    MissingObject { tag: String, id: String, span: Span },
    #[error("`{value}` is neither a snake_case object nor a {{placeholder}} at {span}")]
    NotSnakeCase { value: String, span: Span },
    #[error("<{tag}> expects {expected} child node(s), found {found} at {span}")]
    Arity {
        tag: String,
        expected: String,
        found: usize,
        span: Span,
    },
    #[error("unexpected text `{text}` at {span}")]
    UnexpectedText { text: String, span: Span },
    #[error("duplicate tree id `{id}` at {span}")]
    DuplicateTree { id: String, span: Span },
    #[error("SubTree references undefined tree `{id}` at {span}")]
    UndefinedSubTree { id: String, span: Span },
    #[error("main tree `{id}` is not defined")]
    MissingMainTree { id: String },
}
