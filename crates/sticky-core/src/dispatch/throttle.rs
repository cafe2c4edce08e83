use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::action::Action;
use super::{Dispatch, Invoke};
use crate::runtime::RuntimeHandle;
use crate::timer::TimerRegistration;

struct ThrottleState {
    // Present while executions are blocked; the timer lifts the block.
    blocked: Option<TimerRegistration>,
    disposed: bool,
}

struct ThrottleInner<A> {
    runtime: RuntimeHandle,
    wait: Duration,
    action: Rc<Action<A>>,
    state: RefCell<ThrottleState>,
}

impl<A: 'static> ThrottleInner<A> {
    fn invoke(self: &Rc<Self>, args: A) -> Invoke {
        if !self.runtime.is_alive() {
            return Invoke::Disposed;
        }
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Invoke::Disposed;
        }
        if state.blocked.is_some() {
            log::trace!("throttled call dropped");
            return Invoke::Dropped;
        }
        if !self.wait.is_zero() {
            let weak = Rc::downgrade(self);
            state.blocked = Some(self.runtime.timer().schedule(self.wait, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.borrow_mut().blocked = None;
                }
            }));
        }
        drop(state);
        if self.action.run(args) {
            Invoke::Executed
        } else {
            Invoke::Dropped
        }
    }

    fn dispose(&self) {
        let blocked = {
            let mut state = self.state.borrow_mut();
            state.disposed = true;
            state.blocked.take()
        };
        if let Some(blocked) = blocked {
            blocked.cancel();
        }
    }
}

/// Runs an action at most once per `wait`, dropping calls in between.
///
/// Dropped calls are not queued and their arguments are not kept; there is
/// no trailing run. A zero `wait` never blocks.
pub struct Throttler<A: 'static> {
    inner: Rc<ThrottleInner<A>>,
}

impl<A: 'static> Throttler<A> {
    pub fn new(runtime: &RuntimeHandle, wait: Duration, action: impl FnMut(A) + 'static) -> Self {
        Self::with_action(runtime, wait, Action::new(action))
    }

    pub(crate) fn with_action(
        runtime: &RuntimeHandle,
        wait: Duration,
        action: Rc<Action<A>>,
    ) -> Self {
        Self {
            inner: Rc::new(ThrottleInner {
                runtime: runtime.clone(),
                wait,
                action,
                state: RefCell::new(ThrottleState {
                    blocked: None,
                    disposed: false,
                }),
            }),
        }
    }

    pub fn invoke(&self, args: A) -> Invoke {
        self.inner.invoke(args)
    }

    pub fn is_blocked(&self) -> bool {
        self.inner.state.borrow().blocked.is_some()
    }

    pub fn wait(&self) -> Duration {
        self.inner.wait
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

impl<A: 'static> Dispatch<A> for Throttler<A> {
    fn invoke(&self, args: A) -> Invoke {
        Throttler::invoke(self, args)
    }

    fn dispose(&self) {
        Throttler::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        Throttler::is_disposed(self)
    }
}

impl<A: 'static> Drop for Throttler<A> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

#[cfg(test)]
#[path = "tests/throttle_tests.rs"]
mod tests;
