//! Task Execution Engine
//!
//! This module provides the background task execution engine: a serializing
//! dispatcher with a durable fallback source, and an independent bounded
//! pool executor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DispatcherHandle                          │
//! │  Push tasks, query state/counts, request graceful stop      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      Dispatcher                              │
//! │  Single-consumer loop: drain TaskQueue, fall back to        │
//! │  TaskStore when empty, run one task at a time               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ TaskQueue   │  │ TaskStore   │  │ Listeners           │  │
//! │  │ FIFO+counts │  │ (durable)   │  │ queue/state events  │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PoolExecutor                             │
//! │  Submit and run concurrently, bounded by worker cap         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **WorkTask**: An opaque unit of work with a `run` operation, an
//!   `after_run` cleanup hook and a human-readable description. Tasks are
//!   keyed by [`TaskKind`] for per-kind queue accounting.
//!
//! - **Dispatcher**: The single dedicated consumer. Exactly one task
//!   executes at a time through this path, so queued tasks may touch shared
//!   library state without being concurrency-safe themselves. The in-memory
//!   queue always has priority; the durable store is consulted only when
//!   the queue is momentarily empty, and re-polled on a bounded idle
//!   timeout so persisted tasks are never starved.
//!
//! - **PoolExecutor**: Bounded parallelism for independent tasks. No queue
//!   priority, no durable fallback, no ordering guarantees.
//!
//! # Execution Guarantees
//!
//! - Tasks pushed to the queue run strictly in submission order.
//! - A failing or panicking task never takes down the dispatcher; the next
//!   task still runs.
//! - `after_run` is always invoked, whether `run` succeeded, failed or
//!   panicked, under both execution models.
//! - Graceful stop lets the in-flight task (and its `after_run`) finish,
//!   then stops pulling work permanently.

pub mod config;
pub mod dispatcher;
pub mod listener;
pub mod pool;
pub mod queue;
pub mod store;
pub mod task;

pub use config::{
    DispatcherConfig, PoolConfig, DEFAULT_IDLE_POLL_INTERVAL, DEFAULT_MAX_WORKERS,
    DEFAULT_MIN_WORKERS,
};
pub use dispatcher::{Dispatcher, DispatcherHandle, DispatcherState};
pub use listener::{DispatcherListener, NullListener, TracingListener};
pub use pool::PoolExecutor;
pub use queue::TaskQueue;
pub use store::{DecodeError, PersistedTaskRecord, StoreError, StoreFuture, TaskDecoder, TaskStore};
pub use task::{TaskError, TaskFuture, TaskKind, WorkTask};
