//! # Tick Engine
//!
//! Runtime form of a resolved plan. Every node owns its tick memory (composite
//! cursor, retry failure count, timeout start), so re-parsing a plan always
//! yields a fresh tree.
//!
//! ## Transition Rules
//!
//! | Node | Behaviour |
//! |------|-----------|
//! | Sequence | Ticks the child at the cursor. `Failure` resets and fails; `Running` keeps the cursor; `Success` advances, succeeding after the last child. |
//! | Fallback | Dual of Sequence. |
//! | RetryUntilSuccessful | `Failure` counts an attempt and restarts the child until the limit is reached. |
//! | Timeout | Fails and halts its child once elapsed time reaches the budget. |
//! | Action | Status reported by the primitive bridge for this tick. |
//! | Condition | Predicate query, never `Running`. |
//!
//! A composite ticks at most one child per external tick, so a two-action
//! sequence of single-tick primitives completes on the second tick.
//!
//! ## Cancellation
//!
//! Halting a subtree calls [`PrimitiveBackend::abort`](crate::bridge::PrimitiveBackend::abort)
//! for each leaf whose last status was `Running` and resets all memory below it.
//! Effects already applied by the backend stay applied.

mod context;
mod node;

pub use context::TickContext;
pub use node::TickNode;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::{
    ast::{Node, ObjRef},
    bridge::{PrimitiveBridge, PrimitiveStatus},
    resolver::ResolvedPlan,
};
use node::NodeState;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, Serialize, Deserialize,
)]
pub enum ExecutionStatus {
    /// Not ticked since creation or the last halt.
    #[default]
    Idle,
    Running,
    Success,
    Failure,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Success | ExecutionStatus::Failure)
    }
}

impl From<PrimitiveStatus> for ExecutionStatus {
    fn from(status: PrimitiveStatus) -> Self {
        match status {
            PrimitiveStatus::Success => ExecutionStatus::Success,
            PrimitiveStatus::Running => ExecutionStatus::Running,
            PrimitiveStatus::Failure => ExecutionStatus::Failure,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("SubTree `{0}` must be resolved before building")]
    UnresolvedSubTree(String),
    #[error("placeholder `{{{0}}}` must be bound before building")]
    UnboundPlaceholder(String),
    #[error("{0} has no children")]
    EmptyComposite(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorTree {
    root: TickNode,
    ticks: u64,
}

impl BehaviorTree {
    pub fn build(plan: &ResolvedPlan) -> EngineResult<Self> {
        Self::from_root(plan.root())
    }

    /// Builds directly from a node that contains no SubTree or placeholder.
    pub fn from_root(root: &Node) -> EngineResult<Self> {
        Ok(Self {
            root: build_node(root)?,
            ticks: 0,
        })
    }

    pub fn tick(&mut self, bridge: &mut PrimitiveBridge, ctx: &TickContext) -> ExecutionStatus {
        self.ticks += 1;
        let status = self.root.tick(bridge, ctx);
        tracing::trace!(tick = ctx.tick, status = %status, "tree ticked");
        status
    }

    pub fn halt(&mut self, bridge: &mut PrimitiveBridge) {
        tracing::debug!(ticks = self.ticks, "halting tree");
        self.root.halt(bridge);
    }

    pub fn status(&self) -> ExecutionStatus {
        self.root.status()
    }

    /// Number of times [`tick`](Self::tick) has been called.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn root(&self) -> &TickNode {
        &self.root
    }
}

fn concrete(obj: &ObjRef) -> EngineResult<String> {
    match obj {
        ObjRef::Concrete(value) => Ok(value.clone()),
        ObjRef::Placeholder(name) => Err(EngineError::UnboundPlaceholder(name.clone())),
    }
}

fn build_children(kind: &str, children: &[Node]) -> EngineResult<Vec<TickNode>> {
    if children.is_empty() {
        return Err(EngineError::EmptyComposite(kind.to_string()));
    }
    children.iter().map(build_node).collect()
}

fn build_node(node: &Node) -> EngineResult<TickNode> {
    let built = match node {
        Node::Sequence { children } => TickNode::new(
            NodeState::Sequence {
                children: build_children("Sequence", children)?,
                cursor: 0,
            },
            None,
        ),
        Node::Fallback { children } => TickNode::new(
            NodeState::Fallback {
                children: build_children("Fallback", children)?,
                cursor: 0,
            },
            None,
        ),
        Node::Retry { attempts, child } => TickNode::new(
            NodeState::Retry {
                limit: *attempts,
                failures: 0,
                child: Box::new(build_node(child)?),
            },
            None,
        ),
        Node::Timeout { budget, child } => TickNode::new(
            NodeState::Timeout {
                budget: *budget,
                started_at: None,
                child: Box::new(build_node(child)?),
            },
            None,
        ),
        Node::SubTree { id, .. } => return Err(EngineError::UnresolvedSubTree(id.clone())),
        Node::Action { id, obj, name } => TickNode::new(
            NodeState::Action {
                primitive: id.clone(),
                obj: obj.as_ref().map(concrete).transpose()?,
            },
            name.clone(),
        ),
        Node::Condition { id, obj, name } => TickNode::new(
            NodeState::Condition {
                predicate: id.clone(),
                obj: concrete(obj)?,
            },
            name.clone(),
        ),
    };
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::RetryLimit,
        bridge::{PrimitiveBackend, PrimitiveBridge, PrimitiveStatus},
    };
    use std::{collections::VecDeque, time::Duration};

    /// Replays a fixed list of statuses, then repeats the last one.
    struct Replay {
        statuses: VecDeque<PrimitiveStatus>,
        aborted: std::rc::Rc<std::cell::Cell<u32>>,
    }

    impl Replay {
        fn new(statuses: &[PrimitiveStatus]) -> Self {
            Self {
                statuses: statuses.iter().copied().collect(),
                aborted: Default::default(),
            }
        }
    }

    impl PrimitiveBackend for Replay {
        fn name(&self) -> &'static str {
            "replay"
        }

        fn execute(&mut self, _: &str, _: Option<&str>, _: &TickContext) -> PrimitiveStatus {
            if self.statuses.len() > 1 {
                self.statuses.pop_front().unwrap_or(PrimitiveStatus::Failure)
            } else {
                self.statuses.front().copied().unwrap_or(PrimitiveStatus::Failure)
            }
        }

        fn check(&mut self, predicate: &str, _: &str, _: &TickContext) -> bool {
            predicate == "IS_HOLDING"
        }

        fn abort(&mut self, _: &str, _: Option<&str>) {
            self.aborted.set(self.aborted.get() + 1);
        }
    }

    fn run(tree: &mut BehaviorTree, bridge: &mut PrimitiveBridge, ticks: u64) -> Vec<ExecutionStatus> {
        (1..=ticks)
            .map(|tick| tree.tick(bridge, &TickContext::new(tick, Duration::ZERO)))
            .collect()
    }

    #[test]
    fn test_sequence_dispatches_one_child_per_tick() {
        let mut tree = BehaviorTree::from_root(&Node::sequence(vec![
            Node::action("NAVIGATE_TO", Some("apple")),
            Node::action("GRASP", Some("apple")),
        ]))
        .unwrap();
        let mut bridge = PrimitiveBridge::new(Replay::new(&[PrimitiveStatus::Success]));
        assert_eq!(
            run(&mut tree, &mut bridge, 2),
            vec![ExecutionStatus::Running, ExecutionStatus::Success]
        );
        assert_eq!(bridge.dispatch_count(), 2);
    }

    #[test]
    fn test_sequence_failure_skips_later_children() {
        let mut tree = BehaviorTree::from_root(&Node::sequence(vec![
            Node::action("NAVIGATE_TO", Some("apple")),
            Node::action("GRASP", Some("apple")),
        ]))
        .unwrap();
        let mut bridge = PrimitiveBridge::new(Replay::new(&[PrimitiveStatus::Failure]));
        assert_eq!(run(&mut tree, &mut bridge, 1), vec![ExecutionStatus::Failure]);
        assert_eq!(bridge.dispatch_count(), 1);
    }

    #[test]
    fn test_fallback_stops_at_first_success() {
        let mut tree = BehaviorTree::from_root(&Node::fallback(vec![
            Node::condition("IS_OPEN", "fridge"),
            Node::condition("IS_HOLDING", "apple"),
            Node::action("GRASP", Some("apple")),
        ]))
        .unwrap();
        let mut bridge = PrimitiveBridge::new(Replay::new(&[PrimitiveStatus::Success]));
        assert_eq!(
            run(&mut tree, &mut bridge, 2),
            vec![ExecutionStatus::Running, ExecutionStatus::Success]
        );
        assert_eq!(bridge.dispatch_count(), 0);
    }

    #[test]
    fn test_retry_recovers_after_failure() {
        let mut tree = BehaviorTree::from_root(&Node::retry(
            RetryLimit::Limited(3),
            Node::action("GRASP", Some("apple")),
        ))
        .unwrap();
        let mut bridge = PrimitiveBridge::new(Replay::new(&[
            PrimitiveStatus::Failure,
            PrimitiveStatus::Running,
            PrimitiveStatus::Success,
        ]));
        assert_eq!(
            run(&mut tree, &mut bridge, 3),
            vec![
                ExecutionStatus::Running,
                ExecutionStatus::Running,
                ExecutionStatus::Success
            ]
        );
    }

    #[test]
    fn test_retry_exhaustion_starts_fresh_budget() {
        let mut tree = BehaviorTree::from_root(&Node::retry(
            RetryLimit::Limited(2),
            Node::action("GRASP", Some("apple")),
        ))
        .unwrap();
        let mut bridge = PrimitiveBridge::new(Replay::new(&[PrimitiveStatus::Failure]));
        assert_eq!(
            run(&mut tree, &mut bridge, 4),
            vec![
                ExecutionStatus::Running,
                ExecutionStatus::Failure,
                ExecutionStatus::Running,
                ExecutionStatus::Failure
            ]
        );
        assert_eq!(bridge.dispatch_count(), 4);
    }

    #[test]
    fn test_timeout_halts_running_child() {
        let mut tree = BehaviorTree::from_root(&Node::timeout(
            Duration::from_millis(200),
            Node::action("NAVIGATE_TO", Some("fridge")),
        ))
        .unwrap();
        let backend = Replay::new(&[PrimitiveStatus::Running]);
        let aborted = backend.aborted.clone();
        let mut bridge = PrimitiveBridge::new(backend);
        let statuses: Vec<ExecutionStatus> = (1..=3u64)
            .map(|tick| {
                let ctx = TickContext::new(tick, Duration::from_millis(100 * (tick - 1)));
                tree.tick(&mut bridge, &ctx)
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ExecutionStatus::Running,
                ExecutionStatus::Running,
                ExecutionStatus::Failure
            ]
        );
        assert_eq!(aborted.get(), 1);
        assert_eq!(bridge.dispatch_count(), 2);
    }

    #[test]
    fn test_build_rejects_unresolved_nodes() {
        assert_eq!(
            BehaviorTree::from_root(&Node::subtree("T_Navigate", vec![])).unwrap_err(),
            EngineError::UnresolvedSubTree("T_Navigate".to_string())
        );
        assert_eq!(
            BehaviorTree::from_root(&Node::action("GRASP", Some("{item}"))).unwrap_err(),
            EngineError::UnboundPlaceholder("item".to_string())
        );
        assert_eq!(
            BehaviorTree::from_root(&Node::sequence(vec![])).unwrap_err(),
            EngineError::EmptyComposite("Sequence".to_string())
        );
    }
}
