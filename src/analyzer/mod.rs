//! # Analyzer
//!
//! Token stream → markup tree → [`Plan`].
//!
//! The generic [`Parser`] trait and its combinators work over any slice of input
//! items; [`parsers::markup`] instantiates them over [`TokenSpan`]s to build an
//! element tree, and [`parsers::plan`] lowers that tree into the plan AST while
//! enforcing the grammar.

pub mod combinators;
pub mod core;
pub mod error;
pub mod parsers;
pub mod prelude;

pub use self::core::ParseError;
pub use self::core::ParseResult;
pub use self::core::Parser;
pub use error::PlanParseError;

use crate::ast::Plan;
use crate::preprocessor::{Preprocessor, TokenPreprocessor};
use crate::tokenizer::token::{TokenSpan, Tokenizer};

/// Parses plan markup into a [`Plan`].
///
/// The text must already be stripped of any surrounding prose; see
/// [`TextPreprocessor`](crate::preprocessor::TextPreprocessor).
///
/// ```
/// use embodied_bt::analyzer::parse_plan;
///
/// let plan = parse_plan(r#"
///     <root main_tree_to_execute="MainTree">
///       <BehaviorTree ID="MainTree">
///         <Sequence>
///           <Action ID="NAVIGATE_TO" obj="apple"/>
///           <Action ID="GRASP" obj="apple"/>
///         </Sequence>
///       </BehaviorTree>
///     </root>"#).unwrap();
/// assert_eq!(plan.main_tree, "MainTree");
/// assert_eq!(plan.trees.len(), 1);
/// ```
#[tracing::instrument(level = "debug", skip(text))]
pub fn parse_plan(text: &str) -> Result<Plan, PlanParseError> {
    if text.trim().is_empty() {
        return Err(PlanParseError::EmptyInput);
    }
    let mut tokenizer = Tokenizer::new();
    let spans: Vec<TokenSpan> = TokenPreprocessor.process(tokenizer.tokenize(text)?);
    if spans.is_empty() {
        return Err(PlanParseError::EmptyInput);
    }

    let (pos, document) = parsers::parse_document().parse(&spans, 0)?;
    if let Some(trailing) = spans.get(pos) {
        return Err(PlanParseError::TrailingContent {
            span: trailing.span(),
        });
    }
    parsers::lower(&document)
}
