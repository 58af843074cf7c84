use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the driver knows about the current tick. Passed unchanged to every
/// node and to the primitive backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickContext {
    /// 1-based index of the external tick.
    pub tick: u64,
    /// Time elapsed since the first tick, as reported by the driver's clock.
    pub elapsed: Duration,
}

impl TickContext {
    pub fn new(tick: u64, elapsed: Duration) -> Self {
        Self { tick, elapsed }
    }
}
