//! Testing utilities and harness for sticky runtimes.
//!
//! [`TestRuntime`] drives a [`sticky_core::Runtime`] on a manual clock so
//! timer-driven behavior can be checked deterministically, and
//! [`Recorder`] captures when an action ran and with what.

pub mod clock;
pub mod recorder;
pub mod runtime;

pub use clock::ManualClock;
pub use recorder::Recorder;
pub use runtime::{RecordingScheduler, TestRuntime};

use std::time::Duration;

/// Shorthand for `Duration::from_millis`.
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

pub mod prelude {
    pub use crate::{ms, ManualClock, Recorder, RecordingScheduler, TestRuntime};
}
