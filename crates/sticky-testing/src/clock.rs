use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sticky_core::Clock;

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time. Moving backwards is ignored so the clock stays
    /// monotonic.
    pub fn set(&self, now: Duration) {
        self.nanos
            .fetch_max(now.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
