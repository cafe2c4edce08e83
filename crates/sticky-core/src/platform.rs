//! Platform abstraction traits for runtime services.
//!
//! The host (an event loop, a test harness) owns the real timers and the
//! display refresh. These traits let the runtime ask it for wake-ups and read
//! its clock without depending on a particular environment.

use std::time::Duration;

/// Receives wake-up requests from the runtime.
///
/// Implementations must be safe to use from multiple threads; the runtime
/// itself stays on the thread that created it.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host drive a new frame.
    fn schedule_frame(&self);

    /// Request that the host pump the runtime's timers no later than
    /// `deadline`, measured on the runtime's [`Clock`].
    fn schedule_wakeup(&self, deadline: Duration);
}

/// Provides monotonic time for the runtime.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Time elapsed since `earlier`, saturating at zero.
    fn elapsed_since(&self, earlier: Duration) -> Duration {
        self.now().saturating_sub(earlier)
    }
}
