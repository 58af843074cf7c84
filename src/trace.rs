//! Episode execution trace and failure log.
//!
//! Failure records are shaped for a validator dataset: one JSON object per
//! failure with the failing primitive, its parameters and a stable error type.

use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{bridge::PrimitiveFailure, bridge::PrimitiveStatus, InternalResult};

pub const REJECTION_ERROR_TYPE: &str = "validation_rejected";
const UNREPORTED_ERROR_TYPE: &str = "primitive_execution_error";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub episode_id: String,
    pub dispatches: Vec<DispatchRecord>,
    pub failures: Vec<FailureRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub tick: u64,
    pub primitive: String,
    pub obj: Option<String>,
    pub status: PrimitiveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub episode_id: String,
    pub tick: u64,
    pub error_type: String,
    pub error_message: String,
    pub failed_node: FailedNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedNode {
    pub id: String,
    pub params: BTreeMap<String, String>,
}

impl FailureRecord {
    /// Shorthand for `failed_node.id`.
    pub fn primitive(&self) -> &str {
        &self.failed_node.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceStatistics {
    pub total_dispatches: usize,
    pub total_errors: usize,
    pub error_types: BTreeMap<String, usize>,
    pub failed_primitives: BTreeMap<String, usize>,
}

impl ExecutionTrace {
    pub fn new(episode_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            ..Self::default()
        }
    }

    pub fn record_dispatch(
        &mut self,
        tick: u64,
        primitive: &str,
        obj: Option<&str>,
        status: PrimitiveStatus,
    ) {
        self.dispatches.push(DispatchRecord {
            tick,
            primitive: primitive.to_string(),
            obj: obj.map(str::to_string),
            status,
        });
    }

    pub fn record_failure(
        &mut self,
        tick: u64,
        primitive: &str,
        obj: Option<&str>,
        failure: Option<&PrimitiveFailure>,
    ) {
        let (error_type, error_message) = match failure {
            Some(failure) => (failure.error_type().to_string(), failure.to_string()),
            None => (
                UNREPORTED_ERROR_TYPE.to_string(),
                format!("{} reported failure", primitive),
            ),
        };
        let params = obj
            .map(|obj| BTreeMap::from([("obj".to_string(), obj.to_string())]))
            .unwrap_or_default();
        self.failures.push(FailureRecord {
            episode_id: self.episode_id.clone(),
            tick,
            error_type,
            error_message,
            failed_node: FailedNode {
                id: primitive.to_string(),
                params,
            },
        });
    }

    /// Logs a validator rejection against the plan as a whole (tick 0).
    pub fn record_rejection(&mut self, reason: &str) {
        self.failures.push(FailureRecord {
            episode_id: self.episode_id.clone(),
            tick: 0,
            error_type: REJECTION_ERROR_TYPE.to_string(),
            error_message: reason.to_string(),
            failed_node: FailedNode {
                id: "root".to_string(),
                params: BTreeMap::new(),
            },
        });
    }

    pub fn statistics(&self) -> TraceStatistics {
        let mut stats = TraceStatistics {
            total_dispatches: self.dispatches.len(),
            total_errors: self.failures.len(),
            ..TraceStatistics::default()
        };
        for failure in &self.failures {
            *stats
                .error_types
                .entry(failure.error_type.clone())
                .or_default() += 1;
            *stats
                .failed_primitives
                .entry(failure.failed_node.id.clone())
                .or_default() += 1;
        }
        stats
    }

    pub fn to_json(&self) -> InternalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Appends one JSON line per failure to `path`.
    pub fn append_failures<P: AsRef<Path>>(&self, path: P) -> InternalResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        for failure in &self.failures {
            serde_json::to_writer(&mut writer, failure)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            failures = self.failures.len(),
            "failure log appended"
        );
        Ok(())
    }
}
