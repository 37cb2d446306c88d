//! Engine configuration.
//!
//! Configuration for the dispatcher and the pool executor, with defaults
//! matching the server's stock settings.

use std::time::Duration;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default bounded idle wait before re-polling the durable store.
///
/// This is what lets the dispatcher pick up persisted tasks (written by a
/// crash-recovery path or another process) even when nothing is ever pushed
/// to the in-memory queue.
pub const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default minimum pool executor workers.
pub const DEFAULT_MIN_WORKERS: usize = 5;

/// Default maximum pool executor workers.
pub const DEFAULT_MAX_WORKERS: usize = 10;

// =============================================================================
// Dispatcher Configuration
// =============================================================================

/// Configuration for the [`Dispatcher`](super::dispatcher::Dispatcher).
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// How long the idle dispatcher waits for a push before consulting the
    /// durable store again.
    pub idle_poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_poll_interval: DEFAULT_IDLE_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// Pool Configuration
// =============================================================================

/// Configuration for the [`PoolExecutor`](super::pool::PoolExecutor).
///
/// `max_workers` caps how many submitted tasks run concurrently. Admission
/// is unbounded: submissions beyond the cap wait for a worker slot without
/// blocking the submitter. `min_workers` is the pool's steady-state size
/// as reported to diagnostics; the async runtime owns the actual threads,
/// so it does not pre-spawn anything.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Steady-state pool size.
    pub min_workers: usize,

    /// Concurrency cap.
    pub max_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_MIN_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatcher_config_default() {
        let config = DispatcherConfig::default();
        assert_eq!(config.idle_poll_interval, DEFAULT_IDLE_POLL_INTERVAL);
    }

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.min_workers, DEFAULT_MIN_WORKERS);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert!(config.min_workers <= config.max_workers);
    }
}
