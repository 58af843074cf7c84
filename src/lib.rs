//! # embodied-bt: Behavior Tree Execution for Embodied Plans
//!
//! embodied-bt turns plan text produced by a language-model collaborator into a
//! behavior tree and drives it, tick by tick, against a pluggable primitive
//! backend.
//!
//! ## Processing Pipeline
//!
//! ```text
//! raw text → Preprocessor → Tokenizer → Analyzer → Resolver → Validator → Engine ← Driver
//!                                                                          ↓
//!                                                                Primitive Bridge → Backend
//! ```
//!
//! ### Stage 1: Preprocessing
//!
//! The [`preprocessor`] module strips markdown fences and prose around the plan
//! and, after tokenization, drops comments and whitespace.
//!
//! ### Stage 2: Tokenization
//!
//! The [`tokenizer`] module lexes the BehaviorTree.CPP markup dialect into spanned
//! tokens with line and column information.
//!
//! ### Stage 3: Parsing
//!
//! The [`analyzer`] module builds an element tree with a parser-combinator layer
//! and lowers it into an [`ast::Plan`], rejecting unknown tags, malformed
//! attributes and undefined references.
//!
//! ### Stage 4: Resolution
//!
//! The [`resolver`] module inlines every `SubTree` with its bindings substituted
//! and detects reference cycles.
//!
//! ### Stage 5: Conformance
//!
//! The [`validator`] module accepts or rejects the resolved plan against a
//! grammar profile, the episode's allowed primitives and static ordering rules.
//!
//! ### Stage 6: Execution
//!
//! The [`engine`] module holds per-node tick memory; the [`driver`] ticks the
//! root until it settles or the tick budget runs out. Leaves reach the robot
//! only through the [`bridge`].
//!
//! ## Shared Tables
//!
//! The [`primitive`] catalogue classifies every primitive once. The parser,
//! validator, backends and prompt/comment helpers all read it.
//!
//! ## Quick Start
//!
//! ```
//! use embodied_bt::{config::EngineConfig, pipeline::{Episode, Pipeline}};
//!
//! let pipeline = Pipeline::new(EngineConfig::default());
//! let report = pipeline.run_symbolic(
//!     &Episode::new("demo"),
//!     r#"<root main_tree_to_execute="MainTree">
//!          <BehaviorTree ID="MainTree">
//!            <Sequence>
//!              <Action ID="NAVIGATE_TO" obj="apple"/>
//!              <Action ID="GRASP" obj="apple"/>
//!            </Sequence>
//!          </BehaviorTree>
//!        </root>"#,
//! );
//! assert!(report.outcome.is_success());
//! ```

pub mod analyzer;
pub mod ast;
pub mod bridge;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod pipeline;
pub mod preprocessor;
pub mod primitive;
pub mod resolver;
pub mod tokenizer;
pub mod trace;
pub mod validator;

pub use analyzer::parse_plan;
pub use error::{Error, InternalResult};
pub use resolver::resolve;
