use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use crate::collections::map::HashMap;
use crate::frame_clock::FrameClock;
use crate::platform::{Clock, RuntimeScheduler};
use crate::timer::Timer;
use crate::{FrameCallbackId, TimerId};

type TimerCallback = Box<dyn FnOnce() + 'static>;
type FrameCallback = Box<dyn FnOnce(u64) + 'static>;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    clock: Arc<dyn Clock>,
    needs_frame: Cell<bool>,
    // Ordered by deadline, ties broken by registration order.
    timers: RefCell<BTreeMap<(Duration, TimerId), TimerCallback>>,
    timer_deadlines: RefCell<HashMap<TimerId, Duration>>,
    next_timer_id: Cell<TimerId>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_frame_callback_id: Cell<FrameCallbackId>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scheduler,
            clock,
            needs_frame: Cell::new(false),
            timers: RefCell::new(BTreeMap::new()),
            timer_deadlines: RefCell::new(HashMap::new()),
            next_timer_id: Cell::new(1),
            frame_callbacks: RefCell::new(VecDeque::new()),
            next_frame_callback_id: Cell::new(1),
        }
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn request_frame(&self) {
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
    }

    fn register_timer(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = self.next_timer_id.get();
        self.next_timer_id.set(id + 1);
        let deadline = self.now().saturating_add(delay);
        let earliest = self.next_timer_deadline();
        self.timers.borrow_mut().insert((deadline, id), callback);
        self.timer_deadlines.borrow_mut().insert(id, deadline);
        log::debug!("timer {id} armed for {deadline:?}");
        if earliest.map_or(true, |current| deadline < current) {
            self.scheduler.schedule_wakeup(deadline);
        }
        id
    }

    fn cancel_timer(&self, id: TimerId) -> bool {
        let Some(deadline) = self.timer_deadlines.borrow_mut().remove(&id) else {
            return false;
        };
        // The callback is dropped after the borrow is released; its captures
        // may cancel other registrations on drop.
        let callback = self.timers.borrow_mut().remove(&(deadline, id));
        log::debug!("timer {id} cancelled");
        callback.is_some()
    }

    fn is_timer_pending(&self, id: TimerId) -> bool {
        self.timer_deadlines.borrow().contains_key(&id)
    }

    fn next_timer_deadline(&self) -> Option<Duration> {
        self.timers
            .borrow()
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    fn has_timers(&self) -> bool {
        !self.timers.borrow().is_empty()
    }

    fn pop_due_timer(&self, now: Duration) -> Option<TimerCallback> {
        let mut timers = self.timers.borrow_mut();
        let key = *timers.keys().next()?;
        if key.0 > now {
            return None;
        }
        let callback = timers.remove(&key);
        drop(timers);
        self.timer_deadlines.borrow_mut().remove(&key.1);
        callback
    }

    fn run_due_timers(&self) -> usize {
        let now = self.now();
        let mut fired = 0;
        while let Some(callback) = self.pop_due_timer(now) {
            callback();
            fired += 1;
        }
        if fired > 0 {
            if let Some(next) = self.next_timer_deadline() {
                self.scheduler.schedule_wakeup(next);
            }
        }
        fired
    }

    fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty()
    }

    fn register_frame_callback(&self, callback: FrameCallback) -> FrameCallbackId {
        let id = self.next_frame_callback_id.get();
        self.next_frame_callback_id.set(id + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.request_frame();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let removed = {
            let mut callbacks = self.frame_callbacks.borrow_mut();
            let removed = callbacks
                .iter()
                .position(|entry| entry.id == id)
                .and_then(|index| callbacks.remove(index));
            if callbacks.is_empty() {
                self.needs_frame.set(false);
            }
            removed
        };
        drop(removed);
    }

    fn drain_frame_callbacks(&self, frame_time_nanos: u64) -> usize {
        let mut pending: Vec<FrameCallback> = {
            let mut callbacks = self.frame_callbacks.borrow_mut();
            let mut pending = Vec::with_capacity(callbacks.len());
            while let Some(mut entry) = callbacks.pop_front() {
                if let Some(callback) = entry.callback.take() {
                    pending.push(callback);
                }
            }
            pending
        };
        let count = pending.len();
        for callback in pending.drain(..) {
            callback(frame_time_nanos);
        }
        if !self.has_frame_callbacks() {
            self.needs_frame.set(false);
        }
        count
    }
}

/// Owner of the timer and frame queues a host drives.
///
/// The runtime is single-threaded: every callback it runs executes on the
/// thread that calls [`RuntimeHandle::run_due_timers`] or
/// [`RuntimeHandle::drain_frame_callbacks`].
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler, clock)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn now(&self) -> Duration {
        self.inner.now()
    }

    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get()
    }

    pub fn set_needs_frame(&self, value: bool) {
        self.inner.needs_frame.set(value);
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.handle())
    }

    pub fn timer(&self) -> Timer {
        Timer::new(self.handle())
    }
}

/// Scheduler for hosts that poll the runtime instead of waiting for wake-ups.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}

    fn schedule_wakeup(&self, _deadline: Duration) {}
}

/// Weak handle to a [`Runtime`].
///
/// Every operation is a no-op (or returns `None`/`false`) once the runtime
/// has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub fn now(&self) -> Option<Duration> {
        self.0.upgrade().map(|inner| inner.now())
    }

    pub fn schedule_frame(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.request_frame();
        }
    }

    pub fn register_timer(
        &self,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) -> Option<TimerId> {
        self.0
            .upgrade()
            .map(|inner| inner.register_timer(delay, Box::new(callback)))
    }

    pub fn cancel_timer(&self, id: TimerId) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.cancel_timer(id))
            .unwrap_or(false)
    }

    pub fn is_timer_pending(&self, id: TimerId) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.is_timer_pending(id))
            .unwrap_or(false)
    }

    /// Fires every timer whose deadline is at or before the current time,
    /// in deadline order. Returns how many fired.
    pub fn run_due_timers(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.run_due_timers())
            .unwrap_or(0)
    }

    pub fn next_timer_deadline(&self) -> Option<Duration> {
        self.0.upgrade().and_then(|inner| inner.next_timer_deadline())
    }

    pub fn has_pending_timers(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_timers())
            .unwrap_or(false)
    }

    pub fn register_frame_callback(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> Option<FrameCallbackId> {
        self.0
            .upgrade()
            .map(|inner| inner.register_frame_callback(Box::new(callback)))
    }

    pub fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.0.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    /// Runs the frame callbacks registered before this call. Callbacks
    /// registered while draining wait for the next frame.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.drain_frame_callbacks(frame_time_nanos))
            .unwrap_or(0)
    }

    pub fn has_frame_callbacks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_frame_callbacks())
            .unwrap_or(false)
    }

    pub fn needs_frame(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.needs_frame.get())
            .unwrap_or(false)
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.clone())
    }

    pub fn timer(&self) -> Timer {
        Timer::new(self.clone())
    }
}

pub(crate) struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<FrameCallback>,
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler;

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn schedule_frame(&self) {}

    fn schedule_wakeup(&self, _deadline: Duration) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestClock {
    nanos: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl TestClock {
    pub fn set(&self, now: Duration) {
        self.nanos
            .store(now.as_nanos() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for TestClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(std::sync::atomic::Ordering::SeqCst))
    }
}

#[cfg(test)]
pub struct TestRuntime {
    runtime: Runtime,
    clock: Arc<TestClock>,
}

#[cfg(test)]
impl TestRuntime {
    pub fn new() -> Self {
        let clock = Arc::new(TestClock::default());
        Self {
            runtime: Runtime::new(Arc::new(TestScheduler), clock.clone()),
            clock,
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn advance_by(&self, delta: Duration) {
        self.advance_to(self.clock.now() + delta);
    }

    /// Moves the clock forward to `target`, stopping at every timer deadline
    /// on the way so callbacks observe their own firing time.
    pub fn advance_to(&self, target: Duration) {
        while let Some(deadline) = self.runtime.inner.next_timer_deadline() {
            if deadline > target {
                break;
            }
            self.clock.set(deadline.max(self.clock.now()));
            self.runtime.inner.run_due_timers();
        }
        if target > self.clock.now() {
            self.clock.set(target);
        }
    }

    pub fn run_frame(&self) -> usize {
        self.runtime
            .inner
            .drain_frame_callbacks(self.clock.now().as_nanos() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn timers_fire_in_deadline_order_then_registration_order() {
        let runtime = TestRuntime::new();
        let handle = runtime.handle();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("late", 30), ("first", 10), ("second", 10)] {
            let log = log.clone();
            handle.register_timer(ms(delay), move || log.borrow_mut().push(label));
        }

        runtime.advance_by(ms(50));
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let runtime = TestRuntime::new();
        let handle = runtime.handle();
        let fired = Rc::new(Cell::new(false));

        let id = {
            let fired = fired.clone();
            handle
                .register_timer(ms(10), move || fired.set(true))
                .expect("runtime alive")
        };
        assert!(handle.is_timer_pending(id));
        assert!(handle.cancel_timer(id));
        assert!(!handle.cancel_timer(id), "second cancel is a no-op");

        runtime.advance_by(ms(100));
        assert!(!fired.get());
    }

    #[test]
    fn timer_scheduled_from_callback_fires_when_due() {
        let runtime = TestRuntime::new();
        let handle = runtime.handle();
        let times = Rc::new(RefCell::new(Vec::new()));

        {
            let inner_handle = handle.clone();
            let times = times.clone();
            handle.register_timer(ms(10), move || {
                times.borrow_mut().push(inner_handle.now());
                let times = times.clone();
                let nested_handle = inner_handle.clone();
                inner_handle.register_timer(ms(15), move || {
                    times.borrow_mut().push(nested_handle.now());
                });
            });
        }

        runtime.advance_by(ms(40));
        assert_eq!(*times.borrow(), vec![Some(ms(10)), Some(ms(25))]);
        assert!(!handle.has_pending_timers());
    }

    #[test]
    fn frame_callbacks_registered_while_draining_wait_for_next_frame() {
        let runtime = TestRuntime::new();
        let handle = runtime.handle();
        let frames = Rc::new(Cell::new(0));

        {
            let frames = frames.clone();
            let nested = handle.clone();
            handle.register_frame_callback(move |_| {
                frames.set(frames.get() + 1);
                let frames = frames.clone();
                nested.register_frame_callback(move |_| frames.set(frames.get() + 1));
            });
        }
        assert!(handle.needs_frame());

        assert_eq!(runtime.run_frame(), 1);
        assert_eq!(frames.get(), 1);
        assert!(handle.has_frame_callbacks());

        assert_eq!(runtime.run_frame(), 1);
        assert_eq!(frames.get(), 2);
        assert!(!handle.needs_frame());
    }

    #[test]
    fn handle_is_inert_after_runtime_drop() {
        let runtime = TestRuntime::new();
        let handle = runtime.handle();
        drop(runtime);

        assert!(!handle.is_alive());
        assert_eq!(handle.now(), None);
        assert_eq!(handle.register_timer(ms(1), || {}), None);
        assert_eq!(handle.run_due_timers(), 0);
    }
}
