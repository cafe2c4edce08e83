use std::cell::RefCell;
use std::rc::Rc;

/// The wrapped callable, shared between the policies of one dispatcher.
pub(crate) struct Action<A> {
    callable: RefCell<Box<dyn FnMut(A) + 'static>>,
}

impl<A> Action<A> {
    pub(crate) fn new(callable: impl FnMut(A) + 'static) -> Rc<Self> {
        Rc::new(Self {
            callable: RefCell::new(Box::new(callable)),
        })
    }

    /// Runs the action. Returns `false` without running when the action is
    /// already on the stack.
    ///
    /// Panics from the action unwind through here untouched.
    pub(crate) fn run(&self, args: A) -> bool {
        match self.callable.try_borrow_mut() {
            Ok(mut callable) => {
                (*callable)(args);
                true
            }
            Err(_) => {
                log::warn!("re-entrant dispatch refused; action is already running");
                false
            }
        }
    }
}
