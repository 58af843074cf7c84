//! # Preprocessor
//!
//! Bridges raw collaborator output, the tokenizer and the analyzer:
//!
//! ```text
//! LLM text → TextPreprocessor → Tokenizer → TokenPreprocessor → Analyzer
//! ```
//!
//! * **TextPreprocessor**: strips markdown fences and surrounding prose, keeping the
//!   last `<root …>…</root>` block. Plan producers often echo the prompt's template
//!   before their answer, so the last block wins.
//! * **TokenPreprocessor**: filters comment, whitespace and newline tokens, leaving
//!   only the spans the analyzer consumes.

use lazy_static::lazy_static;
use regex::Regex;

use crate::tokenizer::token::TokenSpan;

lazy_static! {
    static ref RE_FENCE: Regex = Regex::new(r"```[A-Za-z0-9_-]*").unwrap();
    static ref RE_ROOT_BLOCK: Regex = Regex::new(r"(?s)<root\b.*?</root\s*>").unwrap();
}

/// A trait for preprocessing different types of input
pub trait Preprocessor<T, U = T> {
    /// Process the input of type T and return the processed result
    fn process(&self, input: T) -> U;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenPreprocessor;

impl Preprocessor<Vec<TokenSpan>> for TokenPreprocessor {
    fn process(&self, input: Vec<TokenSpan>) -> Vec<TokenSpan> {
        input
            .into_iter()
            .filter(|span| {
                !span.token.is_comment() && !span.token.is_whitespace() && !span.token.is_newline()
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextPreprocessor;

impl TextPreprocessor {
    fn strip_fences(&self, input: &str) -> String {
        RE_FENCE.replace_all(input, "").to_string()
    }

    fn last_root_block<'a>(&self, input: &'a str) -> Option<&'a str> {
        RE_ROOT_BLOCK.find_iter(input).last().map(|m| m.as_str())
    }
}

impl Preprocessor<&str, String> for TextPreprocessor {
    fn process(&self, input: &str) -> String {
        let unfenced = self.strip_fences(input);
        match self.last_root_block(&unfenced) {
            Some(block) => block.to_string(),
            None => {
                tracing::debug!("no <root> block found, passing text through");
                unfenced.trim().to_string()
            }
        }
    }
}
