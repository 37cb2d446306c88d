//! Logging infrastructure for the task engine host.
//!
//! Structured logging via `tracing`, with dual output:
//! - a non-blocking log file under the given directory
//! - stdout, for tailing during development
//!
//! Verbosity is controlled through the `RUST_LOG` environment variable and
//! defaults to `info`.

use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping it flushes and closes the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes the global tracing subscriber.
///
/// Creates `log_dir` if needed and truncates any previous log file, so
/// each session starts with a clean log.
///
/// # Errors
///
/// Returns an error if the log directory or file cannot be prepared.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    std::fs::create_dir_all(log_dir)?;
    std::fs::write(Path::new(log_dir).join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true)
        .compact();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_creates_log_file() {
        let dir = std::env::temp_dir().join("taskmill-logging-test");
        let dir_str = dir.to_str().unwrap().to_string();

        // The global subscriber may already be set by another test; only
        // the filesystem side effects are asserted here.
        let _ = init_logging(&dir_str, "taskmill.log");
        assert!(dir.join("taskmill.log").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
