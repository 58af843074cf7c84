use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::SimulationConfig,
    engine::TickContext,
    primitive::{self, Predicate, Primitive, Support},
};

use super::{
    world::{step_budget, WorldState},
    PrimitiveBackend, PrimitiveFailure, PrimitiveStatus,
};

#[derive(Debug, Clone, PartialEq)]
struct InFlight {
    primitive: Primitive,
    obj: Option<String>,
    remaining: u32,
}

impl InFlight {
    fn is(&self, primitive: Primitive, obj: Option<&str>) -> bool {
        self.primitive == primitive && self.obj.as_deref() == obj
    }
}

/// Step-based backend standing in for a physics simulator. Each call advances
/// the current operation by one simulation step.
#[derive(Debug)]
pub struct SimulatedBackend {
    world: WorldState,
    config: SimulationConfig,
    rng: StdRng,
    in_flight: Option<InFlight>,
    last_failure: Option<PrimitiveFailure>,
    steps: u64,
}

impl SimulatedBackend {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            world: WorldState::from_config(&config),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            in_flight: None,
            last_failure: None,
            steps: 0,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Total simulation steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    fn fail(&mut self, failure: PrimitiveFailure) -> PrimitiveStatus {
        self.in_flight = None;
        self.last_failure = Some(failure);
        PrimitiveStatus::Failure
    }

    fn start(&mut self, primitive: Primitive, obj: Option<&str>) -> Result<InFlight, PrimitiveFailure> {
        if primitive.spec().support == Support::Ghost {
            return Err(PrimitiveFailure::Unsupported(primitive.id().to_string()));
        }
        self.world.precondition(primitive, obj)?;
        if primitive == Primitive::NavigateTo {
            self.world.clear_location();
        }
        tracing::trace!(primitive = primitive.id(), "operation started");
        Ok(InFlight {
            primitive,
            obj: obj.map(str::to_string),
            remaining: step_budget(primitive, &self.config),
        })
    }

    fn complete(&mut self, primitive: Primitive, obj: Option<&str>) -> Result<(), PrimitiveFailure> {
        if primitive == Primitive::Grasp {
            let roll: f64 = self.rng.gen();
            if roll >= self.config.grasp_success_rate {
                return Err(PrimitiveFailure::GraspSlipped(
                    obj.unwrap_or_default().to_string(),
                ));
            }
        }
        self.world.apply(primitive, obj)
    }
}

impl PrimitiveBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn execute(&mut self, primitive: &str, obj: Option<&str>, _ctx: &TickContext) -> PrimitiveStatus {
        let Some(spec) = primitive::lookup(primitive) else {
            return self.fail(PrimitiveFailure::UnknownPrimitive(primitive.to_string()));
        };
        let primitive = spec.primitive;

        let mut op = match self.in_flight.take() {
            Some(op) if op.is(primitive, obj) => op,
            previous => {
                if let Some(previous) = previous {
                    tracing::debug!(
                        dropped = previous.primitive.id(),
                        "new primitive replaces in-flight operation"
                    );
                }
                match self.start(primitive, obj) {
                    Ok(op) => op,
                    Err(failure) => return self.fail(failure),
                }
            }
        };

        self.steps += 1;
        op.remaining = op.remaining.saturating_sub(1);
        if op.remaining > 0 {
            self.in_flight = Some(op);
            return PrimitiveStatus::Running;
        }
        match self.complete(primitive, obj) {
            Ok(()) => PrimitiveStatus::Success,
            Err(failure) => self.fail(failure),
        }
    }

    fn check(&mut self, predicate: &str, obj: &str, _ctx: &TickContext) -> bool {
        Predicate::lookup(predicate).map_or(false, |predicate| self.world.holds(predicate, obj))
    }

    fn abort(&mut self, primitive: &str, obj: Option<&str>) {
        let matches = primitive::lookup(primitive).map_or(false, |spec| {
            self.in_flight
                .as_ref()
                .map_or(false, |op| op.is(spec.primitive, obj))
        });
        if matches {
            self.in_flight = None;
            tracing::debug!(primitive, "in-flight operation aborted");
        }
    }

    fn take_failure(&mut self) -> Option<PrimitiveFailure> {
        self.last_failure.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(backend: &mut SimulatedBackend, primitive: &str, obj: Option<&str>) -> Vec<PrimitiveStatus> {
        let ctx = TickContext::default();
        let mut statuses = Vec::new();
        loop {
            let status = backend.execute(primitive, obj, &ctx);
            statuses.push(status);
            if status != PrimitiveStatus::Running {
                return statuses;
            }
        }
    }

    #[test]
    fn test_navigation_takes_configured_steps() {
        let mut backend = SimulatedBackend::new(SimulationConfig::default());
        let statuses = drive(&mut backend, "NAVIGATE_TO", Some("apple"));
        assert_eq!(statuses.len(), 5);
        assert_eq!(statuses.last(), Some(&PrimitiveStatus::Success));
        assert_eq!(backend.world().robot_at(), Some("apple"));
        assert_eq!(backend.steps(), 5);
    }

    #[test]
    fn test_ghost_and_unreachable_fail() {
        let config = SimulationConfig {
            unreachable_objects: vec!["attic".to_string()],
            ..SimulationConfig::default()
        };
        let mut backend = SimulatedBackend::new(config);
        assert_eq!(
            drive(&mut backend, "NAVIGATE_TO", Some("attic")),
            vec![PrimitiveStatus::Failure]
        );
        assert_eq!(
            backend.take_failure(),
            Some(PrimitiveFailure::Unreachable("attic".into()))
        );
        drive(&mut backend, "NAVIGATE_TO", Some("box"));
        assert_eq!(drive(&mut backend, "PUSH", Some("box")), vec![PrimitiveStatus::Failure]);
        assert_eq!(
            backend.take_failure(),
            Some(PrimitiveFailure::Unsupported("PUSH".into()))
        );
    }

    #[test]
    fn test_grasp_slip_is_seeded() {
        let config = SimulationConfig {
            grasp_success_rate: 0.0,
            ..SimulationConfig::default()
        };
        let mut backend = SimulatedBackend::new(config);
        drive(&mut backend, "NAVIGATE_TO", Some("apple"));
        let statuses = drive(&mut backend, "GRASP", Some("apple"));
        assert_eq!(statuses.last(), Some(&PrimitiveStatus::Failure));
        assert_eq!(
            backend.take_failure(),
            Some(PrimitiveFailure::GraspSlipped("apple".into()))
        );
        assert_eq!(backend.world().held(), None);
    }

    #[test]
    fn test_abort_navigation_leaves_robot_nowhere() {
        let mut backend = SimulatedBackend::new(SimulationConfig::default());
        let ctx = TickContext::default();
        drive(&mut backend, "NAVIGATE_TO", Some("table"));
        assert_eq!(
            backend.execute("NAVIGATE_TO", Some("fridge"), &ctx),
            PrimitiveStatus::Running
        );
        backend.abort("NAVIGATE_TO", Some("fridge"));
        assert!(!backend.is_busy());
        assert_eq!(backend.world().robot_at(), None);
    }
}
