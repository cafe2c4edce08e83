use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::action::Action;
use super::{DebounceOptions, Debouncer, Dispatch, DispatchError, Invoke, Throttler};
use crate::runtime::RuntimeHandle;

/// Thresholds for [`AdaptiveDispatcher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdaptiveConfig {
    /// Length of the call-counting window. The count resets when a call
    /// arrives a full window after the window started.
    pub window: Duration,
    /// More calls than this inside one window route to the throttler.
    pub throttle_threshold: u32,
    /// A call arriving sooner than this after the previous one routes to the
    /// debouncer.
    pub recency: Duration,
    pub debounce_wait: Duration,
    pub throttle_wait: Duration,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
            throttle_threshold: 10,
            recency: Duration::from_millis(100),
            debounce_wait: Duration::from_millis(300),
            throttle_wait: Duration::from_millis(50),
        }
    }
}

impl AdaptiveConfig {
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_throttle_threshold(mut self, threshold: u32) -> Self {
        self.throttle_threshold = threshold;
        self
    }

    pub fn with_recency(mut self, recency: Duration) -> Self {
        self.recency = recency;
        self
    }

    pub fn with_debounce_wait(mut self, wait: Duration) -> Self {
        self.debounce_wait = wait;
        self
    }

    pub fn with_throttle_wait(mut self, wait: Duration) -> Self {
        self.throttle_wait = wait;
        self
    }

    fn validate(self) -> Result<Self, DispatchError> {
        if self.window.is_zero() {
            return Err(DispatchError::ZeroWindow);
        }
        if self.throttle_threshold == 0 {
            return Err(DispatchError::ZeroThreshold);
        }
        Ok(self)
    }
}

/// Policy chosen for one call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Immediate,
    Debounced,
    Throttled,
}

#[derive(Default)]
struct RateWindow {
    started: Option<Duration>,
    calls: u32,
    last_update: Option<Duration>,
    last_route: Option<Route>,
}

/// Chooses between immediate, debounced and throttled execution per call,
/// based on how often calls have been arriving.
pub struct AdaptiveDispatcher<A: 'static> {
    runtime: RuntimeHandle,
    config: AdaptiveConfig,
    action: Rc<Action<A>>,
    debouncer: Debouncer<A>,
    throttler: Throttler<A>,
    window: RefCell<RateWindow>,
    disposed: Cell<bool>,
}

impl<A: 'static> AdaptiveDispatcher<A> {
    pub fn new(
        runtime: &RuntimeHandle,
        config: AdaptiveConfig,
        action: impl FnMut(A) + 'static,
    ) -> Result<Self, DispatchError> {
        let config = config.validate()?;
        let action = Action::new(action);
        let debouncer = Debouncer::with_action(
            runtime,
            config.debounce_wait,
            DebounceOptions::default(),
            action.clone(),
        )?;
        let throttler = Throttler::with_action(runtime, config.throttle_wait, action.clone());
        Ok(Self {
            runtime: runtime.clone(),
            config,
            action,
            debouncer,
            throttler,
            window: RefCell::new(RateWindow::default()),
            disposed: Cell::new(false),
        })
    }

    fn classify(&self, now: Duration) -> Route {
        let mut window = self.window.borrow_mut();
        let expired = window
            .started
            .map_or(true, |started| now.saturating_sub(started) >= self.config.window);
        if expired {
            window.started = Some(now);
            window.calls = 0;
        }
        window.calls = window.calls.saturating_add(1);

        let route = if window.calls > self.config.throttle_threshold {
            Route::Throttled
        } else if window
            .last_update
            .is_some_and(|last| now.saturating_sub(last) < self.config.recency)
        {
            Route::Debounced
        } else {
            Route::Immediate
        };
        window.last_update = Some(now);
        window.last_route = Some(route);
        route
    }

    pub fn update(&self, args: A) -> Invoke {
        if self.disposed.get() {
            return Invoke::Disposed;
        }
        let Some(now) = self.runtime.now() else {
            return Invoke::Disposed;
        };
        let route = self.classify(now);
        log::trace!("adaptive dispatch routed {route:?} at {now:?}");
        match route {
            Route::Throttled => {
                let outcome = self.throttler.invoke(args);
                if outcome.executed() {
                    self.debouncer.cancel();
                }
                outcome
            }
            Route::Debounced => self.debouncer.invoke(args),
            Route::Immediate => {
                // A pending debounced run holds older arguments.
                self.debouncer.cancel();
                if self.action.run(args) {
                    Invoke::Executed
                } else {
                    Invoke::Dropped
                }
            }
        }
    }

    /// Route taken by the most recent [`update`](Self::update).
    pub fn last_route(&self) -> Option<Route> {
        self.window.borrow().last_route
    }

    /// Calls counted in the current window.
    pub fn calls_in_window(&self) -> u32 {
        self.window.borrow().calls
    }

    pub fn config(&self) -> AdaptiveConfig {
        self.config
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
        self.debouncer.dispose();
        self.throttler.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl<A: 'static> Dispatch<A> for AdaptiveDispatcher<A> {
    fn invoke(&self, args: A) -> Invoke {
        self.update(args)
    }

    fn dispose(&self) {
        AdaptiveDispatcher::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        AdaptiveDispatcher::is_disposed(self)
    }
}

#[cfg(test)]
#[path = "tests/adaptive_tests.rs"]
mod tests;
