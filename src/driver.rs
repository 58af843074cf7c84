//! Tick driver: the single caller that ticks a tree until it settles or the
//! tick budget runs out.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::{
    bridge::PrimitiveBridge,
    config::DriverConfig,
    engine::{BehaviorTree, ExecutionStatus, TickContext},
};

/// Source of elapsed time for the tick context.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    /// Elapsed time at the start of 1-based tick `tick`.
    fn now(&mut self, tick: u64) -> Duration;

    /// Called after every non-terminal tick.
    fn pace(&mut self) {}
}

/// Each tick is credited a fixed interval; the first tick is at zero.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedClock {
    interval: Duration,
}

impl SimulatedClock {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Clock for SimulatedClock {
    fn now(&mut self, tick: u64) -> Duration {
        let steps = u32::try_from(tick.saturating_sub(1)).unwrap_or(u32::MAX);
        self.interval.saturating_mul(steps)
    }
}

/// Real elapsed time. Sleeps in [`pace`](Clock::pace) so ticks are at least
/// `cadence` apart.
#[derive(Debug)]
pub struct WallClock {
    start: Option<Instant>,
    last_tick: Option<Instant>,
    cadence: Duration,
}

impl WallClock {
    pub fn new(cadence: Duration) -> Self {
        Self {
            start: None,
            last_tick: None,
            cadence,
        }
    }
}

impl Clock for WallClock {
    fn now(&mut self, _tick: u64) -> Duration {
        let now = Instant::now();
        self.last_tick = Some(now);
        now.duration_since(*self.start.get_or_insert(now))
    }

    fn pace(&mut self) {
        if let Some(last) = self.last_tick {
            let spent = last.elapsed();
            if spent < self.cadence {
                std::thread::sleep(self.cadence - spent);
            }
        }
    }
}

/// Builds the clock a driver config asks for.
pub fn clock_for(config: &DriverConfig) -> Box<dyn Clock> {
    if config.realtime {
        Box::new(WallClock::new(config.tick_interval))
    } else {
        Box::new(SimulatedClock::new(config.tick_interval))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriveOutcome {
    Completed { status: ExecutionStatus, ticks: u64 },
    /// Still `Running` after the tick budget. Inconclusive, not a failure.
    BudgetExhausted { ticks: u64 },
}

impl DriveOutcome {
    pub fn ticks(&self) -> u64 {
        match self {
            DriveOutcome::Completed { ticks, .. } | DriveOutcome::BudgetExhausted { ticks } => {
                *ticks
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DriveOutcome::Completed {
                status: ExecutionStatus::Success,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TickDriver {
    max_ticks: u64,
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::from_config(&DriverConfig::default())
    }
}

impl TickDriver {
    pub fn new(max_ticks: u64) -> Self {
        Self { max_ticks }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.max_ticks)
    }

    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    #[tracing::instrument(level = "debug", skip_all, fields(max_ticks = self.max_ticks))]
    pub fn run(
        &self,
        tree: &mut BehaviorTree,
        bridge: &mut PrimitiveBridge,
        clock: &mut dyn Clock,
    ) -> DriveOutcome {
        for tick in 1..=self.max_ticks {
            let ctx = TickContext::new(tick, clock.now(tick));
            let status = tree.tick(bridge, &ctx);
            if status.is_terminal() {
                tracing::debug!(tick, status = %status, "tree completed");
                return DriveOutcome::Completed {
                    status,
                    ticks: tick,
                };
            }
            clock.pace();
        }
        tracing::warn!(ticks = self.max_ticks, "tick budget exhausted");
        tree.halt(bridge);
        DriveOutcome::BudgetExhausted {
            ticks: self.max_ticks,
        }
    }
}
