//! Renders plans back to canonical markup.
//!
//! Output re-parses to an equal [`Plan`](crate::ast::Plan). With
//! [`FormatterConfig::annotate`] every leaf is preceded by its comment phrase,
//! the form used for annotated training data.

pub mod config;
pub mod visitor;

pub use config::FormatterConfig;
pub use visitor::FormatterVisitor;

use crate::ast::{Node, Plan};

pub fn format_plan(plan: &Plan, config: FormatterConfig) -> String {
    FormatterVisitor::new(config).format_plan(plan)
}

pub fn format_node(node: &Node, config: FormatterConfig) -> String {
    FormatterVisitor::new(config).format_node(node)
}
