use thiserror::Error;

use crate::{
    analyzer::PlanParseError, config::ConfigError, engine::EngineError, resolver::ResolveError,
};

/// Crate-level error. Validation rejections and leaf failures are not errors;
/// they are reported as [`Verdict`](crate::validator::Verdict) and
/// [`ExecutionStatus`](crate::engine::ExecutionStatus) values.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] PlanParseError),
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InternalResult<T> = Result<T, Error>;
