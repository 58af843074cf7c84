//! # Primitive Bridge
//!
//! The only boundary between the tick engine and whatever executes robot
//! primitives. A backend implements [`PrimitiveBackend`]; the engine only ever
//! talks to the [`PrimitiveBridge`] wrapping it, and never learns which backend
//! is active.
//!
//! Two backends share one [`world::WorldState`] model:
//!
//! * [`SymbolicBackend`]: every primitive resolves in the tick it is called.
//! * [`SimulatedBackend`]: primitives take a configured number of steps and
//!   may fail for physical reasons.
//!
//! The bridge holds no tree state. It records each dispatch and each failure
//! reason into the episode's [`ExecutionTrace`].

mod simulated;
mod symbolic;
pub mod world;

pub use simulated::SimulatedBackend;
pub use symbolic::SymbolicBackend;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::{engine::TickContext, trace::ExecutionTrace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
pub enum PrimitiveStatus {
    Success,
    Running,
    Failure,
}

/// Why a backend reported `Failure`.
#[derive(Error, Debug, Clone, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PrimitiveFailure {
    #[error("unknown primitive {0}")]
    UnknownPrimitive(String),
    #[error("object {0} is not in the scene")]
    UnknownObject(String),
    #[error("robot is not at {0}")]
    NotAtObject(String),
    #[error("hands are full, holding {0}")]
    HandsFull(String),
    #[error("no object is held")]
    NothingHeld,
    #[error("{0} cannot be reached")]
    Unreachable(String),
    #[error("{0} is not supported by this backend")]
    Unsupported(String),
    #[error("grasp on {0} slipped")]
    GraspSlipped(String),
    #[error("{primitive} requires an object")]
    MissingObject { primitive: String },
}

impl PrimitiveFailure {
    /// Stable identifier for failure logs.
    pub fn error_type(&self) -> &str {
        self.as_ref()
    }
}

pub trait PrimitiveBackend {
    fn name(&self) -> &'static str;

    /// Advances `primitive` on `obj` by one tick.
    fn execute(&mut self, primitive: &str, obj: Option<&str>, ctx: &TickContext)
        -> PrimitiveStatus;

    /// Evaluates a condition predicate against the current world snapshot.
    fn check(&mut self, predicate: &str, obj: &str, ctx: &TickContext) -> bool;

    /// Stops waiting for an in-flight primitive. Applied effects are not undone.
    fn abort(&mut self, _primitive: &str, _obj: Option<&str>) {}

    /// Reason for the most recent `Failure`, if the backend tracks one.
    fn take_failure(&mut self) -> Option<PrimitiveFailure> {
        None
    }
}

pub struct PrimitiveBridge {
    backend: Box<dyn PrimitiveBackend>,
    trace: ExecutionTrace,
}

impl PrimitiveBridge {
    pub fn new(backend: impl PrimitiveBackend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    pub fn from_boxed(backend: Box<dyn PrimitiveBackend>) -> Self {
        Self {
            backend,
            trace: ExecutionTrace::default(),
        }
    }

    pub fn with_episode(mut self, episode_id: impl Into<String>) -> Self {
        self.trace.episode_id = episode_id.into();
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn execute(
        &mut self,
        primitive: &str,
        obj: Option<&str>,
        ctx: &TickContext,
    ) -> PrimitiveStatus {
        let status = self.backend.execute(primitive, obj, ctx);
        tracing::debug!(
            backend = self.backend.name(),
            tick = ctx.tick,
            primitive,
            obj = obj.unwrap_or(""),
            status = %status,
            "dispatch"
        );
        self.trace.record_dispatch(ctx.tick, primitive, obj, status);
        if status == PrimitiveStatus::Failure {
            let failure = self.backend.take_failure();
            if let Some(failure) = &failure {
                tracing::warn!(primitive, obj = obj.unwrap_or(""), "primitive failed: {}", failure);
            }
            self.trace
                .record_failure(ctx.tick, primitive, obj, failure.as_ref());
        }
        status
    }

    pub fn check(&mut self, predicate: &str, obj: &str, ctx: &TickContext) -> bool {
        let holds = self.backend.check(predicate, obj, ctx);
        tracing::debug!(tick = ctx.tick, predicate, obj, holds, "condition");
        holds
    }

    pub fn abort(&mut self, primitive: &str, obj: Option<&str>) {
        tracing::debug!(primitive, obj = obj.unwrap_or(""), "abort");
        self.backend.abort(primitive, obj);
    }

    pub fn dispatch_count(&self) -> usize {
        self.trace.dispatches.len()
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    pub fn into_trace(self) -> ExecutionTrace {
        self.trace
    }
}
