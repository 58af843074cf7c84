use crate::{
    config::SimulationConfig,
    engine::TickContext,
    primitive::{self, Predicate},
};

use super::{world::WorldState, PrimitiveBackend, PrimitiveFailure, PrimitiveStatus};

/// Deterministic backend: every primitive completes or fails in one tick.
#[derive(Debug, Clone, Default)]
pub struct SymbolicBackend {
    world: WorldState,
    last_failure: Option<PrimitiveFailure>,
}

impl SymbolicBackend {
    pub fn new(world: WorldState) -> Self {
        Self {
            world,
            last_failure: None,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(WorldState::from_config(config))
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }
}

impl PrimitiveBackend for SymbolicBackend {
    fn name(&self) -> &'static str {
        "symbolic"
    }

    fn execute(&mut self, primitive: &str, obj: Option<&str>, _ctx: &TickContext) -> PrimitiveStatus {
        let result = match primitive::lookup(primitive) {
            Some(spec) => self.world.apply(spec.primitive, obj),
            None => Err(PrimitiveFailure::UnknownPrimitive(primitive.to_string())),
        };
        match result {
            Ok(()) => PrimitiveStatus::Success,
            Err(failure) => {
                self.last_failure = Some(failure);
                PrimitiveStatus::Failure
            }
        }
    }

    fn check(&mut self, predicate: &str, obj: &str, _ctx: &TickContext) -> bool {
        Predicate::lookup(predicate).map_or(false, |predicate| self.world.holds(predicate, obj))
    }

    fn take_failure(&mut self) -> Option<PrimitiveFailure> {
        self.last_failure.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tick_resolution() {
        let mut backend = SymbolicBackend::default();
        let ctx = TickContext::default();
        assert_eq!(
            backend.execute("NAVIGATE_TO", Some("apple"), &ctx),
            PrimitiveStatus::Success
        );
        assert_eq!(backend.execute("GRASP", Some("apple"), &ctx), PrimitiveStatus::Success);
        assert!(backend.check("IS_HOLDING", "apple", &ctx));
        assert!(!backend.check("IS_SHINY", "apple", &ctx));
        assert_eq!(backend.execute("TELEPORT", None, &ctx), PrimitiveStatus::Failure);
        assert_eq!(
            backend.take_failure(),
            Some(PrimitiveFailure::UnknownPrimitive("TELEPORT".into()))
        );
        assert_eq!(backend.take_failure(), None);
    }

    #[test]
    fn test_ghost_primitives_run_symbolically() {
        let mut backend = SymbolicBackend::default();
        let ctx = TickContext::default();
        backend.execute("NAVIGATE_TO", Some("towel"), &ctx);
        assert_eq!(backend.execute("FOLD", Some("towel"), &ctx), PrimitiveStatus::Success);
        assert!(backend.world().holds(Predicate::IsFolded, "towel"));
    }
}
