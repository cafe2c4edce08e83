use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use sticky_core::RuntimeHandle;

/// Captures each run of an action together with the runtime time it ran at.
///
/// Clones share the same log.
pub struct Recorder<A> {
    runtime: RuntimeHandle,
    calls: Rc<RefCell<Vec<(Duration, A)>>>,
}

impl<A> Clone for Recorder<A> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<A: 'static> Recorder<A> {
    pub fn new(runtime: &RuntimeHandle) -> Self {
        Self {
            runtime: runtime.clone(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// An action that appends to this recorder.
    pub fn sink(&self) -> impl FnMut(A) + 'static {
        let recorder = self.clone();
        move |args| recorder.record(args)
    }

    pub fn record(&self, args: A) {
        let now = self.runtime.now().unwrap_or_default();
        self.calls.borrow_mut().push((now, args));
    }

    pub fn count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Times of every recorded run, in milliseconds.
    pub fn times_ms(&self) -> Vec<u64> {
        self.calls
            .borrow()
            .iter()
            .map(|(at, _)| at.as_millis() as u64)
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl<A: Clone + 'static> Recorder<A> {
    pub fn calls(&self) -> Vec<(Duration, A)> {
        self.calls.borrow().clone()
    }

    pub fn values(&self) -> Vec<A> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn last(&self) -> Option<A> {
        self.calls.borrow().last().map(|(_, args)| args.clone())
    }
}
