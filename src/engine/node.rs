use std::time::Duration;

use crate::{ast::RetryLimit, bridge::PrimitiveBridge};

use super::{ExecutionStatus, TickContext};

/// Per-kind memory carried across ticks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeState {
    Sequence {
        children: Vec<TickNode>,
        cursor: usize,
    },
    Fallback {
        children: Vec<TickNode>,
        cursor: usize,
    },
    Retry {
        limit: RetryLimit,
        failures: u32,
        child: Box<TickNode>,
    },
    Timeout {
        budget: Duration,
        started_at: Option<Duration>,
        child: Box<TickNode>,
    },
    Action {
        primitive: String,
        obj: Option<String>,
    },
    Condition {
        predicate: String,
        obj: String,
    },
}

/// A runtime node: its memory plus the status it returned last.
#[derive(Debug, Clone, PartialEq)]
pub struct TickNode {
    pub(crate) state: NodeState,
    pub(crate) label: Option<String>,
    status: ExecutionStatus,
}

impl TickNode {
    pub(crate) fn new(state: NodeState, label: Option<String>) -> Self {
        Self {
            state,
            label,
            status: ExecutionStatus::Idle,
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn tick(&mut self, bridge: &mut PrimitiveBridge, ctx: &TickContext) -> ExecutionStatus {
        let status = match &mut self.state {
            NodeState::Sequence { children, cursor } => {
                tick_composite(children, cursor, ExecutionStatus::Success, bridge, ctx)
            }
            NodeState::Fallback { children, cursor } => {
                tick_composite(children, cursor, ExecutionStatus::Failure, bridge, ctx)
            }
            NodeState::Retry {
                limit,
                failures,
                child,
            } => match child.tick(bridge, ctx) {
                ExecutionStatus::Failure => {
                    *failures += 1;
                    if limit.is_exhausted(*failures) {
                        tracing::debug!(attempts = *failures, "retry exhausted");
                        *failures = 0;
                        ExecutionStatus::Failure
                    } else {
                        child.halt(bridge);
                        ExecutionStatus::Running
                    }
                }
                ExecutionStatus::Success => {
                    *failures = 0;
                    ExecutionStatus::Success
                }
                other => other,
            },
            NodeState::Timeout {
                budget,
                started_at,
                child,
            } => {
                let start = *started_at.get_or_insert(ctx.elapsed);
                if ctx.elapsed.saturating_sub(start) >= *budget {
                    tracing::debug!(budget_ms = budget.as_millis() as u64, "timeout expired");
                    child.halt(bridge);
                    *started_at = None;
                    ExecutionStatus::Failure
                } else {
                    let status = child.tick(bridge, ctx);
                    if status.is_terminal() {
                        *started_at = None;
                    }
                    status
                }
            }
            NodeState::Action { primitive, obj } => {
                bridge.execute(primitive, obj.as_deref(), ctx).into()
            }
            NodeState::Condition { predicate, obj } => {
                if bridge.check(predicate, obj, ctx) {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Failure
                }
            }
        };
        self.status = status;
        status
    }

    /// Aborts every leaf still running below this node and resets all memory.
    /// Effects the backend already applied are kept.
    pub fn halt(&mut self, bridge: &mut PrimitiveBridge) {
        match &mut self.state {
            NodeState::Sequence { children, cursor } | NodeState::Fallback { children, cursor } => {
                for child in children.iter_mut() {
                    child.halt(bridge);
                }
                *cursor = 0;
            }
            NodeState::Retry {
                failures, child, ..
            } => {
                child.halt(bridge);
                *failures = 0;
            }
            NodeState::Timeout {
                started_at, child, ..
            } => {
                child.halt(bridge);
                *started_at = None;
            }
            NodeState::Action { primitive, obj } => {
                if self.status == ExecutionStatus::Running {
                    bridge.abort(primitive, obj.as_deref());
                }
            }
            NodeState::Condition { .. } => {}
        }
        self.status = ExecutionStatus::Idle;
    }

    pub fn children(&self) -> Vec<&TickNode> {
        match &self.state {
            NodeState::Sequence { children, .. } | NodeState::Fallback { children, .. } => {
                children.iter().collect()
            }
            NodeState::Retry { child, .. } | NodeState::Timeout { child, .. } => {
                vec![child.as_ref()]
            }
            NodeState::Action { .. } | NodeState::Condition { .. } => vec![],
        }
    }
}

/// Sequence when `proceed_on` is Success, Fallback when it is Failure.
/// At most one child is ticked per call.
fn tick_composite(
    children: &mut [TickNode],
    cursor: &mut usize,
    proceed_on: ExecutionStatus,
    bridge: &mut PrimitiveBridge,
    ctx: &TickContext,
) -> ExecutionStatus {
    let Some(child) = children.get_mut(*cursor) else {
        *cursor = 0;
        return proceed_on;
    };
    let status = child.tick(bridge, ctx);
    if status == ExecutionStatus::Running {
        return ExecutionStatus::Running;
    }
    if status != proceed_on {
        *cursor = 0;
        return status;
    }
    *cursor += 1;
    if *cursor == children.len() {
        *cursor = 0;
        proceed_on
    } else {
        ExecutionStatus::Running
    }
}
