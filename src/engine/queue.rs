//! In-memory FIFO task queue with per-kind accounting.
//!
//! The [`TaskQueue`] is the only resource shared between producers (any
//! caller of [`TaskQueue::push`]) and the dispatcher consumer. A single
//! mutex guards both the deque and the count table, so the invariant
//! "sum of per-kind counts == queue length" holds at every observable
//! instant. The wake signal is a [`tokio::sync::Notify`], whose stored
//! permit makes the check-then-wait sequence race-free: a push landing
//! exactly as the dispatcher decides to sleep still wakes it.

use super::task::{TaskKind, WorkTask};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

// =============================================================================
// Kind Counts
// =============================================================================

/// Fixed-size table of live task counts, one slot per [`TaskKind`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct KindCounts([usize; TaskKind::COUNT]);

impl KindCounts {
    pub(crate) fn get(&self, kind: TaskKind) -> usize {
        self.0[kind.index()]
    }

    pub(crate) fn increment(&mut self, kind: TaskKind) {
        self.0[kind.index()] += 1;
    }

    pub(crate) fn decrement(&mut self, kind: TaskKind) {
        debug_assert!(self.0[kind.index()] > 0, "count underflow for {kind}");
        self.0[kind.index()] -= 1;
    }

    pub(crate) fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

// =============================================================================
// Task Queue
// =============================================================================

/// Unbounded, thread-safe FIFO queue of pending worker tasks.
///
/// Safe for any number of concurrent producers and a single consumer.
/// `push` never blocks on capacity and never fails.
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
    wake: Notify,
}

struct QueueInner {
    tasks: VecDeque<Box<dyn WorkTask>>,
    counts: KindCounts,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                counts: KindCounts::default(),
            }),
            wake: Notify::new(),
        }
    }

    /// Appends a task to the tail and wakes the consumer.
    pub fn push(&self, task: Box<dyn WorkTask>) {
        {
            let mut inner = self.inner.lock();
            inner.counts.increment(task.kind());
            inner.tasks.push_back(task);
        }
        // Outside the lock: the consumer may wake and pop immediately.
        self.wake.notify_one();
    }

    /// Removes and returns the head task, if any.
    pub fn pop(&self) -> Option<Box<dyn WorkTask>> {
        let mut inner = self.inner.lock();
        let task = inner.tasks.pop_front()?;
        inner.counts.decrement(task.kind());
        Some(task)
    }

    /// Current queue length.
    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }

    /// Number of queued tasks of the given kind.
    pub fn count_for(&self, kind: TaskKind) -> usize {
        self.inner.lock().counts.get(kind)
    }

    /// Waits until a producer pushes.
    ///
    /// A push that happened since the last wait completes this immediately
    /// (the notify permit), so no wake-up can be lost between a failed
    /// `pop` and this call.
    pub(crate) async fn pushed(&self) {
        self.wake.notified().await;
    }

    #[cfg(test)]
    pub(crate) fn counts_total(&self) -> usize {
        self.inner.lock().counts.total()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TaskQueue")
            .field("len", &inner.tasks.len())
            .field("counts", &inner.counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::task::{TaskError, TaskFuture};
    use std::sync::Arc;

    struct LabelledTask {
        kind: TaskKind,
        label: &'static str,
    }

    impl LabelledTask {
        fn boxed(kind: TaskKind, label: &'static str) -> Box<dyn WorkTask> {
            Box::new(Self { kind, label })
        }
    }

    impl WorkTask for LabelledTask {
        fn kind(&self) -> TaskKind {
            self.kind
        }

        fn description(&self) -> String {
            self.label.to_string()
        }

        fn run(&self) -> TaskFuture<'_> {
            Box::pin(async { Ok::<(), TaskError>(()) })
        }
    }

    #[test]
    fn test_pop_empty_returns_none() {
        let queue = TaskQueue::new();
        assert!(queue.pop().is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        queue.push(LabelledTask::boxed(TaskKind::LibraryScan, "first"));
        queue.push(LabelledTask::boxed(TaskKind::LibraryScan, "second"));
        queue.push(LabelledTask::boxed(TaskKind::LibraryScan, "third"));

        assert_eq!(queue.pop().unwrap().description(), "first");
        assert_eq!(queue.pop().unwrap().description(), "second");
        assert_eq!(queue.pop().unwrap().description(), "third");
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_counts_track_push_and_pop() {
        // Push A, B, A: counts {A:2, B:1}, length 3. After one pop the
        // first A is returned and counts drop to {A:1, B:1}.
        let queue = TaskQueue::new();
        queue.push(LabelledTask::boxed(TaskKind::ArchiveConvert, "a1"));
        queue.push(LabelledTask::boxed(TaskKind::MetadataScrape, "b1"));
        queue.push(LabelledTask::boxed(TaskKind::ArchiveConvert, "a2"));

        assert_eq!(queue.count_for(TaskKind::ArchiveConvert), 2);
        assert_eq!(queue.count_for(TaskKind::MetadataScrape), 1);
        assert_eq!(queue.len(), 3);

        let popped = queue.pop().unwrap();
        assert_eq!(popped.description(), "a1");
        assert_eq!(queue.count_for(TaskKind::ArchiveConvert), 1);
        assert_eq!(queue.count_for(TaskKind::MetadataScrape), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_count_sum_equals_length_under_concurrent_push() {
        let queue = Arc::new(TaskQueue::new());
        let mut handles = Vec::new();

        for producer in 0..4 {
            let queue = Arc::clone(&queue);
            handles.push(std::thread::spawn(move || {
                let kind = TaskKind::ALL[producer % TaskKind::COUNT];
                for _ in 0..100 {
                    queue.push(LabelledTask::boxed(kind, "task"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 400);
        assert_eq!(queue.counts_total(), queue.len());
        assert_eq!(queue.count_for(TaskKind::LibraryScan), 100);
    }

    #[tokio::test]
    async fn test_push_before_wait_is_not_lost() {
        let queue = TaskQueue::new();
        queue.push(LabelledTask::boxed(TaskKind::Maintenance, "early"));

        // The permit from the earlier push completes the wait immediately.
        tokio::time::timeout(std::time::Duration::from_millis(100), queue.pushed())
            .await
            .expect("wake signal was lost");
    }
}
