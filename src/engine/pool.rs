//! Bounded pool executor.
//!
//! The [`PoolExecutor`] is the engine's second, simpler execution model:
//! submit a task and it runs concurrently with everything else, bounded
//! only by a worker cap. There is no queue priority, no durable fallback
//! and no ordering guarantee — tasks submitted here tolerate being lost
//! on crash and must be independently safe for concurrent execution.
//!
//! Admission is unbounded: a submission beyond the worker cap parks on a
//! semaphore permit without ever blocking the submitter. The per-task
//! contract mirrors the dispatcher's: failures are logged and swallowed,
//! and `after_run` always fires.

use super::config::PoolConfig;
use super::task::WorkTask;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Bounded-concurrency executor for fire-and-forget tasks.
///
/// Cheap to clone; clones share the same worker cap.
#[derive(Clone)]
pub struct PoolExecutor {
    workers: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    config: PoolConfig,
}

impl PoolExecutor {
    /// Creates a pool executor with the given worker bounds.
    pub fn new(config: PoolConfig) -> Self {
        info!(
            min_workers = config.min_workers,
            max_workers = config.max_workers,
            "Pool executor created"
        );
        Self {
            workers: Arc::new(Semaphore::new(config.max_workers)),
            active: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Submits a task to run on an available worker slot.
    ///
    /// Returns immediately; the task starts as soon as a slot frees up.
    /// `run` failures and panics are logged; `after_run` is always invoked
    /// afterward.
    pub fn run(&self, task: Box<dyn WorkTask>) {
        let workers = Arc::clone(&self.workers);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if
            // the pool itself is torn down mid-acquire.
            let Ok(_permit) = workers.acquire_owned().await else {
                return;
            };

            active.fetch_add(1, Ordering::Relaxed);
            let description = task.description();
            debug!(task = %description, "Pool task starting");

            match AssertUnwindSafe(task.run()).catch_unwind().await {
                Ok(Ok(())) => debug!(task = %description, "Pool task completed"),
                Ok(Err(err)) => error!(task = %description, error = %err, "Pool task failed"),
                Err(panic) => error!(
                    task = %description,
                    panic = crate::engine::dispatcher::panic_message(&panic),
                    "Pool task panicked"
                ),
            }

            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| task.after_run())) {
                error!(
                    task = %description,
                    panic = crate::engine::dispatcher::panic_message(&panic),
                    "Pool task cleanup panicked"
                );
            }

            active.fetch_sub(1, Ordering::Relaxed);
        });
    }

    /// Number of tasks currently executing.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Worker slots currently free.
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// The pool's configured bounds.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl std::fmt::Debug for PoolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolExecutor")
            .field("max_workers", &self.config.max_workers)
            .field("active", &self.active_count())
            .finish()
    }
}
