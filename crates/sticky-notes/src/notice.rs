//! User-facing notices with repeat suppression.
//!
//! A message shown once is remembered for [`NOTICE_MEMORY`]; repeats inside
//! that period are dropped unless forced. Accepted messages pass through a
//! debouncer, so a burst of different messages surfaces only the last one.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use sticky_core::collections::map::HashMap;
use sticky_core::{Debouncer, Invoke, RuntimeHandle, TimerRegistration};

pub const NOTICE_MEMORY: Duration = Duration::from_secs(3);
pub const NOTICE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Host surface that displays notices.
pub trait NoticeSink {
    fn notify(&self, message: &str);
}

/// Writes notices to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl NoticeSink for LogSink {
    fn notify(&self, message: &str) {
        log::info!("notice: {message}");
    }
}

/// Keeps every notice it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: RefCell<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }
}

impl NoticeSink for RecordingSink {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_owned());
    }
}

type RecentNotices = RefCell<HashMap<String, TimerRegistration>>;

pub struct Notifier {
    runtime: RuntimeHandle,
    recent: Rc<RecentNotices>,
    emit: Debouncer<String>,
}

impl Notifier {
    pub fn new(runtime: &RuntimeHandle, sink: Rc<dyn NoticeSink>) -> Self {
        let emit = Debouncer::trailing(runtime, NOTICE_DEBOUNCE, move |message: String| {
            sink.notify(&message);
        });
        Self {
            runtime: runtime.clone(),
            recent: Rc::new(RefCell::new(HashMap::new())),
            emit,
        }
    }

    /// Queues `message`. Returns `false` when it repeats a recent notice and
    /// `force` is not set.
    pub fn show(&self, message: &str, force: bool) -> bool {
        if !force && self.is_recent(message) {
            log::trace!("suppressed repeated notice {message:?}");
            return false;
        }
        let weak: Weak<RecentNotices> = Rc::downgrade(&self.recent);
        let key = message.to_owned();
        let expiry = self.runtime.timer().schedule(NOTICE_MEMORY, move || {
            if let Some(recent) = weak.upgrade() {
                let expired = recent.borrow_mut().remove(&key);
                drop(expired);
            }
        });
        let replaced = self
            .recent
            .borrow_mut()
            .insert(message.to_owned(), expiry);
        drop(replaced);
        !matches!(self.emit.invoke(message.to_owned()), Invoke::Disposed)
    }

    pub fn is_recent(&self, message: &str) -> bool {
        self.recent.borrow().contains_key(message)
    }

    /// Emits a pending notice now instead of after the debounce.
    pub fn flush(&self) -> bool {
        self.emit.flush()
    }
}
