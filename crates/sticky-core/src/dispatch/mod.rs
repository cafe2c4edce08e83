//! Rate-limited dispatch of actions fed by UI event streams.
//!
//! Each dispatcher wraps one action and decides, per [`Dispatch::invoke`],
//! whether to run it now, later, or not at all:
//!
//! - [`Debouncer`] waits for a quiet period and runs with the latest arguments.
//! - [`Throttler`] runs at most once per interval and drops the rest.
//! - [`FrameBatcher`] runs at most once per frame with the latest arguments.
//! - [`AdaptiveDispatcher`] picks one of the above per call from the recent
//!   call rate.
//!
//! Dispatchers are owned by the component that needs them. Dropping one
//! disposes it; scheduled callbacks only hold weak references, so a dropped
//! dispatcher never runs its action.

mod action;
mod adaptive;
mod debounce;
mod frame_batch;
mod throttle;

pub use adaptive::{AdaptiveConfig, AdaptiveDispatcher, Route};
pub use debounce::{DebounceOptions, Debouncer};
pub use frame_batch::FrameBatcher;
pub use throttle::Throttler;

/// What a dispatcher did with one invocation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Invoke {
    /// The action ran during this call.
    Executed,
    /// A delayed execution was scheduled.
    Scheduled,
    /// Folded into work that was already pending; the arguments replace any
    /// earlier ones.
    Coalesced,
    /// Refused; the arguments were discarded.
    Dropped,
    /// The dispatcher is disposed or its runtime is gone.
    Disposed,
}

impl Invoke {
    pub fn executed(self) -> bool {
        self == Invoke::Executed
    }
}

/// Common surface for binding any dispatch policy to an event source.
pub trait Dispatch<A> {
    fn invoke(&self, args: A) -> Invoke;

    /// Cancels pending work and refuses further calls. Idempotent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("debounce needs the leading edge, the trailing edge, or both")]
    NoEdge,
    #[error("adaptive throttle threshold must allow at least one call per window")]
    ZeroThreshold,
    #[error("adaptive counting window must be longer than zero")]
    ZeroWindow,
}
