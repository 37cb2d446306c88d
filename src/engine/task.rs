//! Worker task trait and related types.
//!
//! A [`WorkTask`] is the unit of work both execution models operate on.
//! Concrete task bodies (library scans, archive conversions, metadata
//! scrapes) live in the surrounding application; the engine only invokes
//! them.
//!
//! # Example
//!
//! ```ignore
//! use taskmill::engine::{TaskError, TaskFuture, TaskKind, WorkTask};
//!
//! struct ScanLibraryTask { root: std::path::PathBuf }
//!
//! impl WorkTask for ScanLibraryTask {
//!     fn kind(&self) -> TaskKind { TaskKind::LibraryScan }
//!     fn description(&self) -> String { format!("Scan {}", self.root.display()) }
//!     fn run(&self) -> TaskFuture<'_> {
//!         Box::pin(async move {
//!             // ... walk the directory tree ...
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

// =============================================================================
// Task Kind
// =============================================================================

/// The closed set of task families the server submits to the engine.
///
/// Kinds are the accounting key for queue diagnostics ("N comics queued for
/// conversion"). Using a closed enum rather than a runtime type tag keeps
/// the per-kind count table fixed-size and the count invariant checkable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Full or incremental scan of a library root for new/changed files.
    LibraryScan,

    /// Conversion of a comic archive to the preferred format.
    ArchiveConvert,

    /// Fetching metadata for a book from an external source.
    MetadataScrape,

    /// Housekeeping work (cache trims, thumbnail regeneration).
    Maintenance,
}

impl TaskKind {
    /// Number of task kinds. Sized to the count table in the queue.
    pub const COUNT: usize = 4;

    /// All kinds, in count-table order.
    pub const ALL: [TaskKind; TaskKind::COUNT] = [
        TaskKind::LibraryScan,
        TaskKind::ArchiveConvert,
        TaskKind::MetadataScrape,
        TaskKind::Maintenance,
    ];

    /// Position of this kind in the count table.
    pub(crate) fn index(self) -> usize {
        match self {
            TaskKind::LibraryScan => 0,
            TaskKind::ArchiveConvert => 1,
            TaskKind::MetadataScrape => 2,
            TaskKind::Maintenance => 3,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::LibraryScan => write!(f, "LibraryScan"),
            TaskKind::ArchiveConvert => write!(f, "ArchiveConvert"),
            TaskKind::MetadataScrape => write!(f, "MetadataScrape"),
            TaskKind::Maintenance => write!(f, "Maintenance"),
        }
    }
}

// =============================================================================
// Task Error
// =============================================================================

/// Error returned by a task body.
///
/// Task errors are logged with the task's description and absorbed by the
/// executing engine; they never propagate to other tasks or to the caller
/// that submitted the task. Task-level failure reporting (audit log entries
/// and the like) is the task body's own responsibility.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TaskError {
    /// Creates a task error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a task error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// =============================================================================
// Work Task
// =============================================================================

/// Future returned by [`WorkTask::run`].
pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'a>>;

/// A unit of background work.
///
/// Implementations are provided by the surrounding application; the engine
/// invokes them but never constructs them, except when decoding persisted
/// records via a [`TaskDecoder`](super::store::TaskDecoder).
///
/// # Contract
///
/// Both execution models honor the same per-task contract:
///
/// 1. `run` is invoked once. Errors and panics are caught and logged by
///    the engine, never propagated.
/// 2. `after_run` is invoked exactly once afterward, regardless of how
///    `run` ended. It is a best-effort cleanup hook; its own failures are
///    logged and swallowed.
///
/// Tasks executed through the [`Dispatcher`](super::dispatcher::Dispatcher)
/// run strictly one at a time and may therefore manipulate shared library
/// state freely. Tasks submitted to the
/// [`PoolExecutor`](super::pool::PoolExecutor) may run concurrently and
/// must be independently safe for that.
pub trait WorkTask: Send + Sync + 'static {
    /// The task family, used as the queue accounting key.
    fn kind(&self) -> TaskKind;

    /// Human-readable description for logging ("Import of foo.cbz").
    fn description(&self) -> String;

    /// Executes the task body.
    fn run(&self) -> TaskFuture<'_>;

    /// Cleanup hook invoked after `run` returns or fails.
    ///
    /// The default does nothing.
    fn after_run(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_index_matches_all_order() {
        for (position, kind) in TaskKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TaskKind::LibraryScan.to_string(), "LibraryScan");
        assert_eq!(TaskKind::ArchiveConvert.to_string(), "ArchiveConvert");
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&TaskKind::MetadataScrape).unwrap();
        assert_eq!(json, "\"metadata_scrape\"");

        let kind: TaskKind = serde_json::from_str("\"library_scan\"").unwrap();
        assert_eq!(kind, TaskKind::LibraryScan);
    }

    #[test]
    fn test_task_error_display() {
        let err = TaskError::new("archive is corrupt");
        assert_eq!(err.to_string(), "archive is corrupt");
    }

    #[test]
    fn test_task_error_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        let err = TaskError::with_source("scan failed", io);
        assert_eq!(err.to_string(), "scan failed");
        assert!(err.source().is_some());
    }
}
