use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sticky_core::{Clock, Runtime, RuntimeHandle, RuntimeScheduler};

use crate::clock::ManualClock;

/// Scheduler that records what the runtime asked the host for.
#[derive(Default)]
pub struct RecordingScheduler {
    frame_requests: AtomicUsize,
    wakeups: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
    /// Returns how many frames were requested since the last call.
    pub fn take_frame_requests(&self) -> usize {
        self.frame_requests.swap(0, Ordering::SeqCst)
    }

    /// Wake-up deadlines requested so far, oldest first.
    pub fn wakeups(&self) -> Vec<Duration> {
        self.wakeups
            .lock()
            .map(|wakeups| wakeups.clone())
            .unwrap_or_default()
    }
}

impl RuntimeScheduler for RecordingScheduler {
    fn schedule_frame(&self) {
        self.frame_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_wakeup(&self, deadline: Duration) {
        if let Ok(mut wakeups) = self.wakeups.lock() {
            wakeups.push(deadline);
        }
    }
}

impl fmt::Debug for RecordingScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingScheduler")
            .field("frame_requests", &self.frame_requests.load(Ordering::SeqCst))
            .finish()
    }
}

/// A runtime on a manual clock.
///
/// Time only moves through [`advance_by`](Self::advance_by) and
/// [`advance_to`](Self::advance_to), which stop at every timer deadline on
/// the way so each callback observes its own firing time.
pub struct TestRuntime {
    runtime: Runtime,
    clock: Arc<ManualClock>,
    scheduler: Arc<RecordingScheduler>,
}

impl TestRuntime {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(RecordingScheduler::default());
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        Self {
            runtime,
            clock,
            scheduler,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<RecordingScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn advance_by(&self, delta: Duration) -> usize {
        self.advance_to(self.clock.now() + delta)
    }

    /// Moves time forward to `target`, firing due timers in order. Returns
    /// how many timers fired.
    pub fn advance_to(&self, target: Duration) -> usize {
        let handle = self.runtime.handle();
        let mut fired = 0;
        while let Some(deadline) = handle.next_timer_deadline() {
            if deadline > target {
                break;
            }
            self.clock.set(deadline);
            fired += handle.run_due_timers();
        }
        self.clock.set(target);
        fired
    }

    /// Fires timers until none are left, giving up after `limit` of them.
    /// Returns how many fired.
    pub fn run_until_idle(&self, limit: usize) -> usize {
        let handle = self.runtime.handle();
        let mut fired = 0;
        while fired < limit {
            let Some(deadline) = handle.next_timer_deadline() else {
                break;
            };
            self.clock.set(deadline);
            fired += handle.run_due_timers();
        }
        if fired >= limit {
            log::warn!("runtime still busy after {limit} timers");
        }
        fired
    }

    /// Drives one frame at the current time. Returns how many frame
    /// callbacks ran.
    pub fn run_frame(&self) -> usize {
        self.runtime
            .handle()
            .drain_frame_callbacks(self.clock.now().as_nanos() as u64)
    }

    pub fn needs_frame(&self) -> bool {
        self.runtime.needs_frame()
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ms;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn advance_reports_fired_timers_and_wakeups() {
        let runtime = TestRuntime::new();
        let fired = Rc::new(Cell::new(0));
        let _registrations: Vec<_> = [30, 10]
            .into_iter()
            .map(|delay| {
                let fired = fired.clone();
                runtime
                    .handle()
                    .timer()
                    .schedule(ms(delay), move || fired.set(fired.get() + 1))
            })
            .collect();

        assert_eq!(runtime.scheduler().wakeups(), vec![ms(30), ms(10)]);
        assert_eq!(runtime.advance_by(ms(15)), 1);
        assert_eq!(runtime.now(), ms(15));
        assert_eq!(runtime.run_until_idle(10), 1);
        assert_eq!(runtime.now(), ms(30));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn frame_requests_are_counted() {
        let runtime = TestRuntime::new();
        let _registration = runtime.handle().frame_clock().with_frame_nanos(|_| {});

        assert!(runtime.needs_frame());
        assert_eq!(runtime.scheduler().take_frame_requests(), 1);
        assert_eq!(runtime.run_frame(), 1);
        assert!(!runtime.needs_frame());
    }
}
