use std::cell::RefCell;
use std::rc::Rc;

use super::action::Action;
use super::{Dispatch, Invoke};
use crate::frame_clock::FrameCallbackRegistration;
use crate::runtime::RuntimeHandle;

struct FrameBatchState<A> {
    last_args: Option<A>,
    scheduled: Option<FrameCallbackRegistration>,
    disposed: bool,
}

struct FrameBatchInner<A> {
    runtime: RuntimeHandle,
    action: Rc<Action<A>>,
    state: RefCell<FrameBatchState<A>>,
}

impl<A: 'static> FrameBatchInner<A> {
    fn invoke(self: &Rc<Self>, args: A) -> Invoke {
        if !self.runtime.is_alive() {
            return Invoke::Disposed;
        }
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return Invoke::Disposed;
        }
        state.last_args = Some(args);
        if state.scheduled.is_some() {
            return Invoke::Coalesced;
        }
        let weak = Rc::downgrade(self);
        state.scheduled = Some(self.runtime.frame_clock().with_frame_nanos(move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_frame();
            }
        }));
        Invoke::Scheduled
    }

    fn on_frame(&self) {
        let mut state = self.state.borrow_mut();
        state.scheduled = None;
        let Some(args) = state.last_args.take() else {
            return;
        };
        drop(state);
        self.action.run(args);
    }

    fn dispose(&self) {
        let scheduled = {
            let mut state = self.state.borrow_mut();
            state.disposed = true;
            state.last_args = None;
            state.scheduled.take()
        };
        if let Some(scheduled) = scheduled {
            scheduled.cancel();
        }
    }
}

/// Runs an action at most once per frame with the latest arguments.
///
/// Latency is bounded by the host's refresh rate rather than a fixed delay.
pub struct FrameBatcher<A: 'static> {
    inner: Rc<FrameBatchInner<A>>,
}

impl<A: 'static> FrameBatcher<A> {
    pub fn new(runtime: &RuntimeHandle, action: impl FnMut(A) + 'static) -> Self {
        Self {
            inner: Rc::new(FrameBatchInner {
                runtime: runtime.clone(),
                action: Action::new(action),
                state: RefCell::new(FrameBatchState {
                    last_args: None,
                    scheduled: None,
                    disposed: false,
                }),
            }),
        }
    }

    pub fn invoke(&self, args: A) -> Invoke {
        self.inner.invoke(args)
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.state.borrow().scheduled.is_some()
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.state.borrow().disposed
    }
}

impl<A: 'static> Dispatch<A> for FrameBatcher<A> {
    fn invoke(&self, args: A) -> Invoke {
        FrameBatcher::invoke(self, args)
    }

    fn dispose(&self) {
        FrameBatcher::dispose(self);
    }

    fn is_disposed(&self) -> bool {
        FrameBatcher::is_disposed(self)
    }
}

impl<A: 'static> Drop for FrameBatcher<A> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}
