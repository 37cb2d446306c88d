//! Taskmill - Background task execution for the media library server
//!
//! This library provides the server's two task execution models:
//!
//! - The [`engine::Dispatcher`]: a single-consumer loop that serializes
//!   heterogeneous worker tasks from an in-memory FIFO queue, falling back
//!   to a durable [`engine::TaskStore`] when the queue is empty. Used for
//!   tasks that mutate shared library state and must never run concurrently
//!   (imports, library scans, archive conversions).
//!
//! - The [`engine::PoolExecutor`]: a bounded-concurrency executor for tasks
//!   that tolerate being lost on crash and need no ordering relative to
//!   other tasks (metadata refreshes, cache warming).
//!
//! # Quick Start
//!
//! ```ignore
//! use taskmill::engine::{Dispatcher, DispatcherConfig};
//!
//! let (dispatcher, handle) = Dispatcher::new(DispatcherConfig::default(), store);
//! tokio::spawn(dispatcher.run());
//!
//! handle.push(Box::new(ScanLibraryTask::new(path)));
//! println!("{} tasks pending", handle.queue_len());
//! ```

pub mod engine;
pub mod logging;

/// Version of the taskmill library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
