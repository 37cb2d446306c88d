//! Dispatcher observation hooks.
//!
//! Listeners are notified when the queue shrinks (a task was taken for
//! execution) and when the dispatcher changes state. Callbacks run
//! synchronously on the dispatcher's own task between work items, so they
//! must not block; anything expensive belongs on the listener's side of a
//! channel.
//!
//! This follows the "emit, don't present" pattern: the engine reports what
//! happened, consumers (UI push channels, metrics, logs) decide what to do
//! with it.

use super::dispatcher::DispatcherState;
use tracing::{debug, info};

/// Observer of dispatcher activity.
///
/// Both hooks default to no-ops so implementations can subscribe to just
/// one of them.
pub trait DispatcherListener: Send + Sync {
    /// The queue's size changed (a task was dequeued for execution).
    fn on_queue_changed(&self) {}

    /// The dispatcher transitioned to a new state.
    fn on_state_changed(&self, state: DispatcherState) {
        let _ = state;
    }
}

/// Listener that ignores all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullListener;

impl DispatcherListener for NullListener {}

/// Listener that logs events via `tracing`.
///
/// State transitions are logged at info level, queue changes at debug.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingListener;

impl DispatcherListener for TracingListener {
    fn on_queue_changed(&self) {
        debug!("Task queue changed");
    }

    fn on_state_changed(&self, state: DispatcherState) {
        info!(%state, "Dispatcher state changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_listener_accepts_events() {
        let listener = NullListener;
        listener.on_queue_changed();
        listener.on_state_changed(DispatcherState::Idle);
    }

    #[test]
    fn test_tracing_listener_accepts_events() {
        let listener = TracingListener;
        listener.on_queue_changed();
        listener.on_state_changed(DispatcherState::Stopped);
    }
}
