#![doc = r"Host-driven runtime and rate-limited dispatchers for sticky notes."]

pub mod collections;
pub mod dispatch;
pub mod frame_clock;
pub mod platform;
pub mod runtime;
pub mod timer;

pub use dispatch::{
    AdaptiveConfig, AdaptiveDispatcher, DebounceOptions, Debouncer, Dispatch, DispatchError,
    FrameBatcher, Invoke, Route, Throttler,
};
pub use frame_clock::{FrameCallbackRegistration, FrameClock};
pub use platform::{Clock, RuntimeScheduler};
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use timer::{Timer, TimerRegistration};

#[cfg(test)]
pub use runtime::{TestClock, TestRuntime, TestScheduler};

pub type TimerId = u64;
pub(crate) type FrameCallbackId = u64;
