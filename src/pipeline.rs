//! # Episode Pipeline
//!
//! Runs one plan text end to end:
//!
//! ```text
//! text → TextPreprocessor → parse_plan → resolve → ConformanceValidator
//!      → BehaviorTree::build → TickDriver::run → EpisodeReport
//! ```
//!
//! Parse failures, resolution failures and validator rejections are reported
//! as distinct outcomes and the plan is never ticked. [`Pipeline::run_with_repair`]
//! feeds the failure reason back to a [`PlanProducer`] for a bounded number of
//! attempts.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::Level;

use crate::{
    analyzer::{parse_plan, PlanParseError},
    bridge::{PrimitiveBackend, PrimitiveBridge, SymbolicBackend},
    config::EngineConfig,
    driver::{clock_for, Clock, DriveOutcome, TickDriver},
    engine::{BehaviorTree, EngineError},
    formatter::{format_node, FormatterConfig},
    preprocessor::{Preprocessor, TextPreprocessor},
    primitive::{
        self,
        phrase::{format_allowed_actions, subtree_templates},
    },
    resolver::{resolve_with_limit, ResolveError, ResolvedPlan},
    trace::ExecutionTrace,
    validator::{ConformanceValidator, Verdict},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub id: String,
    /// Primitives this episode may dispatch. `None` falls back to the config.
    pub allowed_primitives: Option<BTreeSet<String>>,
}

impl Episode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            allowed_primitives: None,
        }
    }

    pub fn with_allowed<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_primitives = Some(allowed.into_iter().map(Into::into).collect());
        self
    }
}

/// Why a plan text never reached the tick driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanFailure {
    #[error("parse error: {0}")]
    Parse(#[from] PlanParseError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("build error: {0}")]
    Build(#[from] EngineError),
    #[error("{0}")]
    Rejected(String),
}

impl PlanFailure {
    /// Text handed back to the plan producer.
    pub fn feedback(&self) -> String {
        self.to_string()
    }

    fn into_outcome(self) -> EpisodeOutcome {
        match self {
            PlanFailure::Parse(e) => EpisodeOutcome::ParseFailed {
                reason: e.to_string(),
            },
            PlanFailure::Resolve(e) => EpisodeOutcome::ResolveFailed {
                reason: e.to_string(),
            },
            PlanFailure::Build(e) => EpisodeOutcome::ResolveFailed {
                reason: e.to_string(),
            },
            PlanFailure::Rejected(reason) => EpisodeOutcome::Rejected { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeOutcome {
    ParseFailed { reason: String },
    ResolveFailed { reason: String },
    Rejected { reason: String },
    Executed { outcome: DriveOutcome },
}

impl EpisodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EpisodeOutcome::Executed { outcome } if outcome.is_success())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub episode_id: String,
    pub backend: String,
    pub outcome: EpisodeOutcome,
    pub dispatches: usize,
    pub trace: ExecutionTrace,
}

impl EpisodeReport {
    /// The validator's verdict, `None` when the plan never reached it.
    pub fn verdict(&self) -> Option<Verdict> {
        match &self.outcome {
            EpisodeOutcome::ParseFailed { .. } | EpisodeOutcome::ResolveFailed { .. } => None,
            EpisodeOutcome::Rejected { reason } => Some(Verdict::Reject(reason.clone())),
            EpisodeOutcome::Executed { .. } => Some(Verdict::Accept),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairReport {
    /// Proposals requested, including the first.
    pub attempts: usize,
    pub report: EpisodeReport,
}

/// Collaborator that turns an instruction into plan text.
pub trait PlanProducer {
    /// `feedback` carries the previous attempt's failure reason.
    fn propose(&mut self, instruction: &str, feedback: Option<&str>) -> String;
}

pub struct Pipeline {
    config: EngineConfig,
    preprocessor: TextPreprocessor,
}

impl Pipeline {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            preprocessor: TextPreprocessor,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whitelist in effect for `episode`.
    pub fn allowed_primitives(&self, episode: &Episode) -> BTreeSet<String> {
        if let Some(allowed) = &episode.allowed_primitives {
            return allowed.clone();
        }
        if !self.config.validator.allowed_primitives.is_empty() {
            return self.config.validator.allowed_primitives.iter().cloned().collect();
        }
        primitive::all_ids().into_iter().map(str::to_string).collect()
    }

    /// Allowed actions and SubTree templates in canonical order, for a plan
    /// producer's prompt.
    pub fn prompt_context(&self, episode: &Episode) -> String {
        let mut ids: Vec<String> = self.allowed_primitives(episode).into_iter().collect();
        ids.sort_by_key(|id| {
            primitive::lookup(id).map_or(usize::MAX, |spec| spec.primitive as usize)
        });
        format!(
            "Allowed actions: {}\nSubTree templates:\n{}",
            format_allowed_actions(&ids),
            subtree_templates(&ids)
        )
    }

    /// Parses, resolves, validates and builds without ticking.
    pub fn prepare(
        &self,
        episode: &Episode,
        text: &str,
    ) -> Result<(ResolvedPlan, BehaviorTree), PlanFailure> {
        let cleaned = self.preprocessor.process(text);
        let plan = parse_plan(&cleaned)?;
        let resolved = resolve_with_limit(&plan, self.config.resolver.max_nodes)?;

        let validator =
            ConformanceValidator::new(self.config.validator.grammar, self.allowed_primitives(episode));
        if let Verdict::Reject(reason) = validator.validate(&resolved) {
            return Err(PlanFailure::Rejected(reason));
        }

        let tree = BehaviorTree::build(&resolved)?;
        if tracing::enabled!(Level::DEBUG) {
            tracing::debug!(
                episode = %episode.id,
                "accepted plan:\n{}",
                format_node(resolved.root(), FormatterConfig::default())
            );
        }
        Ok((resolved, tree))
    }

    #[tracing::instrument(level = "info", skip_all, fields(episode = %episode.id))]
    pub fn run_episode(
        &self,
        episode: &Episode,
        text: &str,
        backend: Box<dyn PrimitiveBackend>,
        clock: &mut dyn Clock,
    ) -> EpisodeReport {
        match self.prepare(episode, text) {
            Ok((_, tree)) => self.execute(episode, tree, backend, clock),
            Err(failure) => {
                tracing::warn!("plan not executed: {}", failure);
                let mut trace = ExecutionTrace::new(episode.id.clone());
                if let PlanFailure::Rejected(reason) = &failure {
                    trace.record_rejection(reason);
                }
                EpisodeReport {
                    episode_id: episode.id.clone(),
                    backend: backend.name().to_string(),
                    outcome: failure.into_outcome(),
                    dispatches: 0,
                    trace,
                }
            }
        }
    }

    fn execute(
        &self,
        episode: &Episode,
        mut tree: BehaviorTree,
        backend: Box<dyn PrimitiveBackend>,
        clock: &mut dyn Clock,
    ) -> EpisodeReport {
        let backend_name = backend.name().to_string();
        let mut bridge = PrimitiveBridge::from_boxed(backend).with_episode(&episode.id);
        let outcome = TickDriver::from_config(&self.config.driver).run(&mut tree, &mut bridge, clock);
        tracing::info!(
            ticks = outcome.ticks(),
            success = outcome.is_success(),
            "episode finished"
        );
        EpisodeReport {
            episode_id: episode.id.clone(),
            backend: backend_name,
            outcome: EpisodeOutcome::Executed { outcome },
            dispatches: bridge.dispatch_count(),
            trace: bridge.into_trace(),
        }
    }

    /// Runs `text` against the symbolic backend with the configured clock.
    pub fn run_symbolic(&self, episode: &Episode, text: &str) -> EpisodeReport {
        let backend = Box::new(SymbolicBackend::from_config(&self.config.simulation));
        let mut clock = clock_for(&self.config.driver);
        self.run_episode(episode, text, backend, clock.as_mut())
    }

    /// Requests plans from `producer` until one is accepted or
    /// `repair.max_attempts` proposals have failed. Only an accepted plan is run.
    #[tracing::instrument(level = "info", skip_all, fields(episode = %episode.id))]
    pub fn run_with_repair(
        &self,
        episode: &Episode,
        producer: &mut dyn PlanProducer,
        instruction: &str,
        backend: Box<dyn PrimitiveBackend>,
        clock: &mut dyn Clock,
    ) -> RepairReport {
        let max_attempts = self.config.repair.max_attempts.max(1);
        let mut feedback: Option<String> = None;
        let mut rejections = ExecutionTrace::new(episode.id.clone());
        let mut last_failure = None;

        for attempt in 1..=max_attempts {
            let text = producer.propose(instruction, feedback.as_deref());
            match self.prepare(episode, &text) {
                Ok((_, tree)) => {
                    let mut report = self.execute(episode, tree, backend, clock);
                    let mut failures = rejections.failures;
                    failures.append(&mut report.trace.failures);
                    report.trace.failures = failures;
                    return RepairReport {
                        attempts: attempt,
                        report,
                    };
                }
                Err(failure) => {
                    tracing::info!(attempt, "proposal failed: {}", failure);
                    if let PlanFailure::Rejected(reason) = &failure {
                        rejections.record_rejection(reason);
                    }
                    feedback = Some(failure.feedback());
                    last_failure = Some(failure);
                }
            }
        }

        let outcome = last_failure
            .map(PlanFailure::into_outcome)
            .unwrap_or(EpisodeOutcome::ParseFailed {
                reason: PlanParseError::EmptyInput.to_string(),
            });
        RepairReport {
            attempts: max_attempts,
            report: EpisodeReport {
                episode_id: episode.id.clone(),
                backend: backend.name().to_string(),
                outcome,
                dispatches: 0,
                trace: rejections,
            },
        }
    }
}
