//! Dispatcher core - state machine and single-consumer run loop.
//!
//! The dispatcher serializes execution of worker tasks from two sources:
//! the in-memory [`TaskQueue`] (always preferred) and the durable
//! [`TaskStore`] (consulted only when the queue is momentarily empty).
//! Exactly one task executes at a time through this path.
//!
//! # State Machine
//!
//! ```text
//! NotStarted ──run()──► Running ◄──────► Idle
//!                          │               │
//!                          └───stop()──────┴──► Stopped (terminal)
//! ```
//!
//! `Idle` means the queue was empty and the dispatcher is in its bounded
//! wait; `Running` means a task was found and is executing. `Stopped` is
//! entered only via [`DispatcherHandle::stop`] and is terminal: the
//! in-flight task finishes (including its `after_run`), then no further
//! work is pulled from either source.
//!
//! # Example
//!
//! ```ignore
//! use taskmill::engine::{Dispatcher, DispatcherConfig, TracingListener};
//!
//! let (mut dispatcher, handle) = Dispatcher::new(DispatcherConfig::default(), store);
//! dispatcher.add_listener(Arc::new(TracingListener));
//! tokio::spawn(dispatcher.run());
//!
//! handle.push(Box::new(ImportBookTask::new(path)));
//! // ... later ...
//! handle.stop();
//! handle.wait_until_stopped().await;
//! ```

use super::config::DispatcherConfig;
use super::listener::DispatcherListener;
use super::queue::TaskQueue;
use super::store::TaskStore;
use super::task::{TaskKind, WorkTask};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// =============================================================================
// Dispatcher State
// =============================================================================

/// Lifecycle state of the dispatcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DispatcherState {
    /// The consumer loop has not begun.
    NotStarted,

    /// The queue is empty; the dispatcher is in its bounded idle wait.
    Idle,

    /// A task is executing.
    Running,

    /// Stop was requested. Terminal: no further tasks are dequeued.
    Stopped,
}

impl DispatcherState {
    /// Whether this is the terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatcherState::Stopped)
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherState::NotStarted => write!(f, "NotStarted"),
            DispatcherState::Idle => write!(f, "Idle"),
            DispatcherState::Running => write!(f, "Running"),
            DispatcherState::Stopped => write!(f, "Stopped"),
        }
    }
}

// =============================================================================
// Dispatcher Handle
// =============================================================================

/// Handle for submitting tasks to, observing and stopping a dispatcher.
///
/// Cloneable; all clones refer to the same dispatcher instance.
#[derive(Clone)]
pub struct DispatcherHandle {
    queue: Arc<TaskQueue>,
    state_rx: watch::Receiver<DispatcherState>,
    shutdown: CancellationToken,
}

impl DispatcherHandle {
    /// Submits a task for serialized execution.
    ///
    /// Never blocks and never fails: the queue is unbounded. Tasks run
    /// strictly in submission order relative to other pushed tasks.
    pub fn push(&self, task: Box<dyn WorkTask>) {
        self.queue.push(task);
    }

    /// Requests a graceful stop.
    ///
    /// The task currently executing (if any) finishes, including its
    /// `after_run`; no further tasks are pulled from the queue or the
    /// store afterward. Idempotent.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Current dispatcher state (non-blocking).
    pub fn state(&self) -> DispatcherState {
        *self.state_rx.borrow()
    }

    /// Number of tasks currently queued.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of queued tasks of the given kind.
    pub fn count_for(&self, kind: TaskKind) -> usize {
        self.queue.count_for(kind)
    }

    /// Waits until the dispatcher has fully stopped.
    pub async fn wait_until_stopped(&self) {
        let mut state_rx = self.state_rx.clone();
        while !state_rx.borrow_and_update().is_terminal() {
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    }
}

impl fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherHandle")
            .field("state", &self.state())
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// The single-consumer task dispatcher.
///
/// Created together with its [`DispatcherHandle`]; consumed by
/// [`Dispatcher::run`], which is typically spawned onto the runtime.
pub struct Dispatcher {
    queue: Arc<TaskQueue>,
    store: Arc<dyn TaskStore>,
    listeners: Vec<Arc<dyn DispatcherListener>>,
    state_tx: watch::Sender<DispatcherState>,
    shutdown: CancellationToken,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Creates a dispatcher and its handle.
    ///
    /// The wake signal and all other coordination state are strictly
    /// per-instance: two dispatchers in the same process never wake each
    /// other.
    pub fn new(config: DispatcherConfig, store: Arc<dyn TaskStore>) -> (Self, DispatcherHandle) {
        let queue = Arc::new(TaskQueue::new());
        let (state_tx, state_rx) = watch::channel(DispatcherState::NotStarted);
        let shutdown = CancellationToken::new();

        let handle = DispatcherHandle {
            queue: Arc::clone(&queue),
            state_rx,
            shutdown: shutdown.clone(),
        };

        let dispatcher = Self {
            queue,
            store,
            listeners: Vec::new(),
            state_tx,
            shutdown,
            config,
        };

        (dispatcher, handle)
    }

    /// Registers a listener. Must be called before [`Dispatcher::run`].
    pub fn add_listener(&mut self, listener: Arc<dyn DispatcherListener>) {
        self.listeners.push(listener);
    }

    /// Runs the consumer loop until a stop is requested.
    ///
    /// Each iteration takes one task from the queue if it has any, falls
    /// back to a single store poll otherwise, and executes whatever was
    /// found on this task before looping. Task failures and panics are
    /// logged and absorbed; a single bad task cannot kill the loop.
    pub async fn run(self) {
        self.set_state(DispatcherState::Running);
        info!(
            idle_poll_interval_ms = self.config.idle_poll_interval.as_millis() as u64,
            "Dispatcher started"
        );

        while !self.shutdown.is_cancelled() {
            let task = match self.queue.pop() {
                Some(task) => {
                    self.notify_queue_changed();
                    Some(task)
                }
                None => self.wait_for_work().await,
            };

            if let Some(task) = task {
                self.set_state(DispatcherState::Running);
                self.execute(task).await;
            }
        }

        self.set_state(DispatcherState::Stopped);
        info!(abandoned = self.queue.len(), "Dispatcher stopped");
    }

    /// Idle path: bounded wait, then queue re-check, then store fallback.
    ///
    /// Returns `None` when nothing was found this iteration or a stop was
    /// requested during the wait.
    async fn wait_for_work(&self) -> Option<Box<dyn WorkTask>> {
        self.set_state(DispatcherState::Idle);

        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => return None,
            _ = self.queue.pushed() => {}
            _ = tokio::time::sleep(self.config.idle_poll_interval) => {}
        }

        // A stop racing the wake-up wins: nothing further is dequeued.
        if self.shutdown.is_cancelled() {
            return None;
        }

        if let Some(task) = self.queue.pop() {
            self.notify_queue_changed();
            return Some(task);
        }

        self.poll_store().await
    }

    /// Asks the durable store for one task.
    ///
    /// Store and decode failures are logged and yield `None`; whether the
    /// offending record is offered again is the store's selection policy.
    async fn poll_store(&self) -> Option<Box<dyn WorkTask>> {
        let record = match self.store.next_eligible().await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "Durable store poll failed");
                return None;
            }
        };

        debug!(kind = %record.kind, "Picked up persisted task");

        let decoder = match self.store.decoder_for(record.kind) {
            Ok(decoder) => decoder,
            Err(err) => {
                warn!(kind = %record.kind, error = %err, "No decoder for persisted task");
                return None;
            }
        };

        match decoder.decode(&record) {
            Ok(task) => Some(task),
            Err(err) => {
                warn!(kind = %record.kind, error = %err, "Failed to decode persisted task");
                None
            }
        }
    }

    /// Executes one task on the dispatcher's own task, then its cleanup.
    ///
    /// `after_run` is invoked whether `run` succeeded, failed or panicked.
    async fn execute(&self, task: Box<dyn WorkTask>) {
        let description = task.description();
        debug!(task = %description, kind = %task.kind(), "Task starting");

        match AssertUnwindSafe(task.run()).catch_unwind().await {
            Ok(Ok(())) => debug!(task = %description, "Task completed"),
            Ok(Err(err)) => error!(task = %description, error = %err, "Task failed"),
            Err(panic) => {
                error!(task = %description, panic = panic_message(&panic), "Task panicked")
            }
        }

        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| task.after_run())) {
            error!(task = %description, panic = panic_message(&panic), "Task cleanup panicked");
        }
    }

    /// Moves to `state`, notifying listeners only on an actual transition.
    fn set_state(&self, state: DispatcherState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            debug!(%state, "Dispatcher state changed");
            for listener in &self.listeners {
                listener.on_state_changed(state);
            }
        }
    }

    fn notify_queue_changed(&self) {
        for listener in &self.listeners {
            listener.on_queue_changed();
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &*self.state_tx.borrow())
            .field("queue_len", &self.queue.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::{PersistedTaskRecord, StoreError, StoreFuture, TaskDecoder};

    /// Store with nothing eligible and no decoders.
    struct EmptyStore;

    impl TaskStore for EmptyStore {
        fn next_eligible(
            &self,
        ) -> StoreFuture<'_, Result<Option<PersistedTaskRecord>, StoreError>> {
            Box::pin(async { Ok(None) })
        }

        fn decoder_for(&self, kind: TaskKind) -> Result<Arc<dyn TaskDecoder>, StoreError> {
            Err(StoreError::NoDecoder(kind))
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(DispatcherState::NotStarted.to_string(), "NotStarted");
        assert_eq!(DispatcherState::Idle.to_string(), "Idle");
        assert_eq!(DispatcherState::Running.to_string(), "Running");
        assert_eq!(DispatcherState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_only_stopped_is_terminal() {
        assert!(DispatcherState::Stopped.is_terminal());
        assert!(!DispatcherState::NotStarted.is_terminal());
        assert!(!DispatcherState::Idle.is_terminal());
        assert!(!DispatcherState::Running.is_terminal());
    }

    #[tokio::test]
    async fn test_initial_state_is_not_started() {
        let (_dispatcher, handle) =
            Dispatcher::new(DispatcherConfig::default(), Arc::new(EmptyStore));
        assert_eq!(handle.state(), DispatcherState::NotStarted);
        assert_eq!(handle.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (dispatcher, handle) =
            Dispatcher::new(DispatcherConfig::default(), Arc::new(EmptyStore));
        let runner = tokio::spawn(dispatcher.run());

        handle.stop();
        handle.stop();
        handle.wait_until_stopped().await;

        assert_eq!(handle.state(), DispatcherState::Stopped);
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn test_panic_message_extraction() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
