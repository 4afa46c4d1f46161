//! Defines all public event types broadcast by a countdown.
//!
//! Listeners subscribe to two streams: the dedicated lifecycle events
//! (`start`, `finished`, `notify`) and the generic transition stream, which
//! carries one `TransitionEvent` for every state change, including the ones
//! that also have a dedicated event.

use std::fmt;

/// The kind of state change reported on the transition stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Start,
    Restart,
    Stop,
    Pause,
    Resume,
    Notify,
    Finished,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Restart => "restart",
            Action::Stop => "stop",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Notify => "notify",
            Action::Finished => "finished",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic transition event: which action happened and the remaining time at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    pub action: Action,
    /// Remaining milliseconds when the transition happened.
    pub left: i64,
}

/// Dedicated lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Fired by `begin()`.
    Start,
    /// Fired once when the remaining time runs out. The payload is always `0`.
    Finished(i64),
    /// Fired when the remaining time reaches a notify threshold. Carries the
    /// remaining milliseconds.
    Notify(i64),
}
