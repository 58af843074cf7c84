#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use embodied_bt::{
    bridge::{PrimitiveBackend, PrimitiveStatus},
    engine::TickContext,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub tick: u64,
    pub primitive: String,
    pub obj: Option<String>,
}

/// Backend answering from fixed per-primitive statuses. Unlisted primitives
/// succeed and unlisted predicates are false.
#[derive(Default)]
pub struct ScriptedBackend {
    statuses: HashMap<String, PrimitiveStatus>,
    predicates: HashMap<(String, String), bool>,
    calls: Rc<RefCell<Vec<Call>>>,
    aborts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, primitive: &str, status: PrimitiveStatus) -> Self {
        self.statuses.insert(primitive.to_string(), status);
        self
    }

    pub fn with_predicate(mut self, predicate: &str, obj: &str, holds: bool) -> Self {
        self.predicates
            .insert((predicate.to_string(), obj.to_string()), holds);
        self
    }

    /// Shared handle on the dispatch log, readable after the backend is boxed.
    pub fn calls(&self) -> Rc<RefCell<Vec<Call>>> {
        self.calls.clone()
    }

    pub fn aborts(&self) -> Rc<RefCell<Vec<String>>> {
        self.aborts.clone()
    }
}

impl PrimitiveBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn execute(&mut self, primitive: &str, obj: Option<&str>, ctx: &TickContext) -> PrimitiveStatus {
        self.calls.borrow_mut().push(Call {
            tick: ctx.tick,
            primitive: primitive.to_string(),
            obj: obj.map(str::to_string),
        });
        self.statuses
            .get(primitive)
            .copied()
            .unwrap_or(PrimitiveStatus::Success)
    }

    fn check(&mut self, predicate: &str, obj: &str, _ctx: &TickContext) -> bool {
        self.predicates
            .get(&(predicate.to_string(), obj.to_string()))
            .copied()
            .unwrap_or(false)
    }

    fn abort(&mut self, primitive: &str, _obj: Option<&str>) {
        self.aborts.borrow_mut().push(primitive.to_string());
    }
}

/// Wraps a main-tree body in a single-tree document.
pub fn document(body: &str) -> String {
    format!(
        r#"<root main_tree_to_execute="MainTree"><BehaviorTree ID="MainTree">{}</BehaviorTree></root>"#,
        body
    )
}
