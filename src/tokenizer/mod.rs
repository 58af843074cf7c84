//! # Tokenizer Component
//!
//! The Tokenizer performs lexical analysis of plan markup, transforming raw text
//! into a positioned token stream for the analyzer.
//!
//! ## Design Principles
//!
//! * **Positioned Tokens**: Each token carries its byte range, line and column so
//!   that every later failure can point at the offending markup.
//! * **Format Preservation**: Whitespace, newlines and comments are kept as tokens;
//!   the [`TokenPreprocessor`](crate::preprocessor::TokenPreprocessor) drops them
//!   before parsing.
//! * **Total Failure**: Unlexable input (an unterminated `<`, an unquoted attribute
//!   value) stops tokenization with a [`TokenizerError`](token::TokenizerError).
//!
//! ## Component Structure
//!
//! * [`token`]: Token types and the tokenizer driver
//! * [`markup`]: Tags, attributes, declarations and text runs
//! * [`comment`]: `<!-- ... -->` comments
//! * [`whitespace`]: Whitespace and newline handling
//!
//! ## Usage Example
//!
//! ```rust
//! use embodied_bt::tokenizer::token::{Token, Tokenizer};
//!
//! let mut tokenizer = Tokenizer::new();
//! let tokens = tokenizer.tokenize(r#"<Action ID="RELEASE"/>"#).unwrap();
//! assert!(matches!(tokens[0].token, Token::OpenTag { self_closing: true, .. }));
//! ```

pub mod comment;
pub mod markup;
pub mod token;
pub mod whitespace;
