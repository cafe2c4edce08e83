use std::cell::{RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

use super::action::Action;
use super::{Dispatch, DispatchError, Invoke};
use crate::runtime::RuntimeHandle;
use crate::timer::TimerRegistration;

/// Edge and ceiling configuration for a [`Debouncer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceOptions {
    /// Run on the first call of a burst.
    pub leading: bool,
    /// Run after the burst ends, with the last call's arguments.
    pub trailing: bool,
    /// Force a run once this long has passed since the last one, even while
    /// calls keep arriving.
    pub max_wait: Option<Duration>,
}

impl Default for DebounceOptions {
    fn default() -> Self {
        Self {
            leading: false,
            trailing: true,
            max_wait: None,
        }
    }
}

impl DebounceOptions {
    pub fn with_leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    pub fn with_trailing(mut self, trailing: bool) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    fn validate(mut self, wait: Duration) -> Result<Self, DispatchError> {
        if !self.leading && !self.trailing {
            return Err(DispatchError::NoEdge);
        }
        // A ceiling below the quiet period would fire before the first
        // trailing edge could.
        self.max_wait = self.max_wait.map(|max_wait| max_wait.max(wait));
        Ok(self)
    }
}

struct DebounceState<A> {
    last_args: Option<A>,
    last_call: Option<Duration>,
    last_invoke: Duration,
    pending: Option<TimerRegistration>,
    disposed: bool,
}

impl<A> DebounceState<A> {
    fn new() -> Self {
        Self {
            last_args: None,
            last_call: None,
            last_invoke: Duration::ZERO,
            pending: None,
            disposed: false,
        }
    }
}

struct DebounceInner<A> {
    runtime: RuntimeHandle,
    wait: Duration,
    options: DebounceOptions,
    action: Rc<Action<A>>,
    state: RefCell<DebounceState<A>>,
}

impl<A: 'static> DebounceInner<A> {
    fn should_invoke(&self, state: &DebounceState<A>, now: Duration) -> bool {
        let Some(last_call) = state.last_call else {
            return true;
        };
        let since_call = now.saturating_sub(last_call);
        let since_invoke = now.saturating_sub(state.last_invoke);
        since_call >= self.wait
            || self
                .options
                .max_wait
                .is_some_and(|max_wait| since_invoke >= max_wait)
    }

    fn remaining_wait(&self, state: &DebounceState<A>, now: Duration) -> Duration {
        let since_call = state
            .last_call
            .map_or(self.wait, |last_call| now.saturating_sub(last_call));
        let waiting = self.wait.saturating_sub(since_call);
        match self.options.max_wait {
            Some(max_wait) => {
                let since_invoke = now.saturating_sub(state.last_invoke);
                waiting.min(max_wait.saturating_sub(since_invoke))
            }
            None => waiting,
        }
    }

    fn start_timer(self: &Rc<Self>, state: &mut DebounceState<A>, delay: Duration) {
        if let Some(previous) = state.pending.take() {
            previous.cancel();
        }
        let weak = Rc::downgrade(self);
        state.pending = Some(self.runtime.timer().schedule(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.timer_expired();
            }
        }));
    }

    fn run(&self, mut state: RefMut<'_, DebounceState<A>>, args: A, now: Duration) -> Invoke {
        state.last_invoke = now;
        drop(state);
        log::trace!("debounced action running at {now:?}");
        if self.action.run(args) {
            Invoke::Executed
        } else {
            Invoke::Dropped
        }
    }

    fn invoke(self: &Rc<Self>, args: A) -> Invoke {
        let Some(now) = self.runtime.now() else {
            return Invoke::Disposed;
        };
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Invoke::Disposed;
        }

        let is_invoking = self.should_invoke(&state, now);
        state.last_call = Some(now);

        if is_invoking && state.pending.is_none() {
            // Leading edge of a new burst.
            state.last_invoke = now;
            self.start_timer(&mut state, self.wait);
            if self.options.leading {
                state.last_args = None;
                return self.run(state, args, now);
            }
            state.last_args = Some(args);
            return Invoke::Scheduled;
        }

        if is_invoking && self.options.max_wait.is_some() {
            self.start_timer(&mut state, self.wait);
            state.last_args = None;
            log::trace!("debounce ceiling reached at {now:?}");
            return self.run(state, args, now);
        }

        state.last_args = Some(args);
        if state.pending.is_none() {
            self.start_timer(&mut state, self.wait);
            return Invoke::Scheduled;
        }
        Invoke::Coalesced
    }

    fn timer_expired(self: &Rc<Self>) {
        let Some(now) = self.runtime.now() else {
            return;
        };
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return;
        }
        if self.should_invoke(&state, now) {
            state.pending = None;
            self.trailing_edge(state, now);
            return;
        }
        let remaining = self.remaining_wait(&state, now);
        self.start_timer(&mut state, remaining);
    }

    fn trailing_edge(&self, mut state: RefMut<'_, DebounceState<A>>, now: Duration) -> bool {
        if self.options.trailing {
            if let Some(args) = state.last_args.take() {
                return self.run(state, args, now).executed();
            }
        }
        state.last_args = None;
        false
    }

    fn flush(&self) -> bool {
        let Some(now) = self.runtime.now() else {
            return false;
        };
        let mut state = self.state.borrow_mut();
        let Some(pending) = state.pending.take() else {
            return false;
        };
        pending.cancel();
        self.trailing_edge(state, now)
    }

    fn cancel(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.last_args = None;
            state.last_call = None;
            state.last_invoke = Duration::ZERO;
            state.pending.take()
        };
        if let Some(pending) = pending {
            pending.cancel();
        }
    }

    fn dispose(&self) {
        self.cancel();
        self.state.borrow_mut().disposed = true;
    }
}

/// Runs an action once calls have been quiet for `wait`.
///
/// A burst of calls closer together than `wait` produces one trailing run
/// with the arguments of the last call. [`DebounceOptions`] adds a leading
/// run and a `max_wait` ceiling for input that never pauses.
pub struct Debouncer<A: 'static> {
    inner: Rc<DebounceInner<A>>,
}

impl<A: 'static> Debouncer<A> {
    pub fn new(
        runtime: &RuntimeHandle,
        wait: Duration,
        options: DebounceOptions,
        action: impl FnMut(A) + 'static,
    ) -> Result<Self, DispatchError> {
        Self::with_action(runtime, wait, options, Action::new(action))
    }

    /// Trailing-edge only debouncer. The default options are always valid,
    /// so this cannot fail.
    pub fn trailing(
        runtime: &RuntimeHandle,
        wait: Duration,
        action: impl FnMut(A) + 'static,
    ) -> Self {
        Self::from_parts(runtime, wait, DebounceOptions::default(), Action::new(action))
    }

    pub(crate) fn with_action(
        runtime: &RuntimeHandle,
        wait: Duration,
        options: DebounceOptions,
        action: Rc<Action<A>>,
    ) -> Result<Self, DispatchError> {
        let options = options.validate(wait)?;
        Ok(Self::from_parts(runtime, wait, options, action))
    }

    fn from_parts(
        runtime: &RuntimeHandle,
        wait: Duration,
        options: DebounceOptions,
        action: Rc<Action<A>>,
    ) -> Self {
        Self {
            inner: Rc::new(DebounceInner {
                runtime: runtime.clone(),
                wait,
                options,
                action,
                state: RefCell::new(DebounceState::new()),
            }),
        }
    }

    pub fn invoke(&self, args: A) -> Invoke {
        self.inner.invoke(args)
    }

    /// Runs a pending trailing execution right away. Returns whether the
    /// action ran.
    pub fn flush(&self) -> bool {
        self.inner.flush()
    }

    /// Drops pending work without running it. The debouncer stays usable.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.state.borrow().pending.is_some()
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    pub fn options(&self) -> DebounceOptions {
        self.inner.options
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

impl<A: 'static> Dispatch<A> for Debouncer<A> {
    fn invoke(&self, args: A) -> Invoke {
        Debouncer::invoke(self, args)
    }

    fn dispose(&self) {
        Debouncer::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        Debouncer::is_disposed(self)
    }
}

impl<A: 'static> Drop for Debouncer<A> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
