//! One-shot timers backed by the runtime's timer queue.

use std::time::Duration;

use crate::runtime::RuntimeHandle;
use crate::TimerId;

#[derive(Clone)]
pub struct Timer {
    runtime: RuntimeHandle,
}

impl Timer {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self { runtime }
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.clone()
    }

    /// Runs `callback` once `delay` has elapsed on the runtime clock.
    ///
    /// The returned registration owns the timer: cancelling or dropping it
    /// guarantees the callback never runs. On a dropped runtime the
    /// registration is inactive and the callback is discarded.
    pub fn schedule(
        &self,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) -> TimerRegistration {
        let runtime = self.runtime.clone();
        match runtime.register_timer(delay, callback) {
            Some(id) => TimerRegistration::new(runtime, id),
            None => TimerRegistration::inactive(runtime),
        }
    }
}

#[must_use = "dropping a TimerRegistration cancels the timer"]
pub struct TimerRegistration {
    runtime: RuntimeHandle,
    id: Option<TimerId>,
}

impl TimerRegistration {
    fn new(runtime: RuntimeHandle, id: TimerId) -> Self {
        Self {
            runtime,
            id: Some(id),
        }
    }

    fn inactive(runtime: RuntimeHandle) -> Self {
        Self { runtime, id: None }
    }

    /// Whether the timer is still waiting to fire.
    pub fn is_pending(&self) -> bool {
        self.id
            .map(|id| self.runtime.is_timer_pending(id))
            .unwrap_or(false)
    }

    pub fn cancel(mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_timer(id);
        }
    }
}

impl Drop for TimerRegistration {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_timer(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TestRuntime;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn dropping_registration_cancels_timer() {
        let runtime = TestRuntime::new();
        let fired = Rc::new(Cell::new(0));

        let registration = {
            let fired = fired.clone();
            runtime
                .handle()
                .timer()
                .schedule(Duration::from_millis(5), move || fired.set(fired.get() + 1))
        };
        assert!(registration.is_pending());
        drop(registration);

        runtime.advance_by(Duration::from_millis(10));
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn registration_reports_fired_timer_as_not_pending() {
        let runtime = TestRuntime::new();
        let registration = runtime
            .handle()
            .timer()
            .schedule(Duration::from_millis(5), || {});

        runtime.advance_by(Duration::from_millis(5));
        assert!(!registration.is_pending());
        registration.cancel();
    }
}
