//! Standard runtime services backed by Rust's `std` library.
//!
//! [`StdRuntime`] pairs a [`sticky_core::Runtime`] with a monotonic clock and
//! a scheduler that records frame and wake-up requests. Hosts without an
//! event loop of their own can drive it with [`StdRuntime::run_until_idle`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use sticky_core::{Clock, FrameClock, Runtime, RuntimeHandle, RuntimeScheduler, Timer};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that delegates work to Rust's threading primitives.
pub struct StdScheduler {
    frame_requested: AtomicBool,
    next_wakeup: Mutex<Option<Duration>>,
    frame_waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            next_wakeup: Mutex::new(None),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a frame has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Returns and clears the earliest wake-up requested since the last call.
    pub fn take_wakeup(&self) -> Option<Duration> {
        self.next_wakeup
            .lock()
            .ok()
            .and_then(|mut wakeup| wakeup.take())
    }

    /// Registers a waker that will be invoked whenever a frame or timer
    /// wake-up is requested.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut slot) = self.frame_waker.write() {
            *slot = Some(Arc::new(waker));
        }
    }

    pub fn clear_frame_waker(&self) {
        if let Ok(mut slot) = self.frame_waker.write() {
            *slot = None;
        }
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .ok()
            .and_then(|slot| slot.clone());
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_frame(&self) {
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn schedule_wakeup(&self, deadline: Duration) {
        if let Ok(mut wakeup) = self.next_wakeup.lock() {
            *wakeup = Some(wakeup.map_or(deadline, |current| current.min(deadline)));
        }
        self.wake();
    }
}

/// Monotonic clock measuring time since its own creation.
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Convenience container bundling the standard scheduler and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Arc<StdClock>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let clock = Arc::new(StdClock::default());
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        Self {
            scheduler,
            clock,
            runtime,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn frame_clock(&self) -> FrameClock {
        self.runtime.frame_clock()
    }

    pub fn timer(&self) -> Timer {
        self.runtime.timer()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Returns whether a frame was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.scheduler.take_frame_request()
    }

    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_frame_waker(waker);
    }

    pub fn clear_frame_waker(&self) {
        self.scheduler.clear_frame_waker();
    }

    /// Fires every timer that is due. Returns how many ran.
    pub fn pump_timers(&self) -> usize {
        self.runtime_handle().run_due_timers()
    }

    /// Drains pending frame callbacks using the provided frame timestamp in
    /// nanoseconds. Returns how many ran.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) -> usize {
        self.runtime_handle()
            .drain_frame_callbacks(frame_time_nanos)
    }

    /// One turn of the host loop: due timers, then a frame if one was
    /// requested. Returns how many callbacks ran.
    pub fn pump(&self) -> usize {
        let mut ran = self.pump_timers();
        if self.take_frame_request() || self.runtime.needs_frame() {
            ran += self.drain_frame_callbacks(self.now().as_nanos() as u64);
        }
        ran
    }

    /// Drives the runtime on the current thread until no timers or frame
    /// callbacks remain, or until `limit` has elapsed. Frames are produced
    /// every `frame_interval` while callbacks are waiting for one.
    ///
    /// Returns `true` if the runtime went idle before the limit.
    pub fn run_until_idle(&self, frame_interval: Duration, limit: Duration) -> bool {
        let started = self.now();
        let handle = self.runtime_handle();
        loop {
            self.pump();
            let frame_pending = handle.has_frame_callbacks();
            let next_timer = handle.next_timer_deadline();
            if !frame_pending && next_timer.is_none() {
                return true;
            }
            let now = self.now();
            if now.saturating_sub(started) >= limit {
                log::debug!("runtime still busy after {limit:?}");
                return false;
            }
            let mut wake_at = started + limit;
            if frame_pending {
                wake_at = wake_at.min(now + frame_interval);
            }
            if let Some(deadline) = next_timer {
                wake_at = wake_at.min(deadline);
            }
            self.scheduler.take_wakeup();
            thread::sleep(wake_at.saturating_sub(now));
        }
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
