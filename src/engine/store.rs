//! Durable task store interface.
//!
//! The [`TaskStore`] is the dispatcher's fallback source: previously
//! persisted tasks that survive process restarts. The engine only reads
//! "next eligible" and decodes; record lifecycle (creation, deletion,
//! retry policy) belongs entirely to the store implementation backing it.
//!
//! A record picked up but not completed before a crash may be re-selected
//! on restart; that is a deliberate best-effort accept, not a bug.

use super::task::{TaskKind, WorkTask};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Persisted Record
// =============================================================================

/// A persisted task as read from the durable store.
///
/// Consumed read-only by the engine: a kind discriminator plus an opaque
/// property bag the kind-specific decoder knows how to interpret.
#[derive(Clone, Debug)]
pub struct PersistedTaskRecord {
    /// Task kind discriminator, selects the decoder.
    pub kind: TaskKind,

    /// Opaque properties captured at submission time.
    pub properties: Map<String, Value>,
}

impl PersistedTaskRecord {
    /// Creates a record with no properties.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            properties: Map::new(),
        }
    }

    /// Adds a property (builder style).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Looks up a property by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No decoder is registered for the record's kind.
    #[error("no decoder registered for task kind {0}")]
    NoDecoder(TaskKind),

    /// The store backend failed (database unreachable, corrupt row, ...).
    #[error("task store backend error: {0}")]
    Backend(String),
}

/// Error decoding a persisted record into a runnable task.
#[derive(Debug, Error)]
#[error("failed to decode {kind} record: {message}")]
pub struct DecodeError {
    /// Kind of the record that failed to decode.
    pub kind: TaskKind,

    /// What went wrong.
    pub message: String,
}

impl DecodeError {
    /// Creates a decode error.
    pub fn new(kind: TaskKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Convenience for the common "property missing from the bag" case.
    pub fn missing_property(kind: TaskKind, key: &str) -> Self {
        Self::new(kind, format!("missing property '{key}'"))
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// Future returned by [`TaskStore::next_eligible`].
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Decodes persisted records of one kind into runnable tasks.
pub trait TaskDecoder: Send + Sync {
    /// Decodes a record into a runnable task.
    fn decode(&self, record: &PersistedTaskRecord) -> Result<Box<dyn WorkTask>, DecodeError>;
}

/// Durable source of previously submitted, not-yet-run tasks.
///
/// Implementations are provided by the persistence layer. The engine never
/// mutates or deletes records; after a successful decode it expects the
/// store to have removed (or to remove) the record so it is not re-selected
/// while still in flight.
pub trait TaskStore: Send + Sync + 'static {
    /// Returns the next eligible persisted record, if any.
    ///
    /// Which record is "next" (and whether a previously failed one is
    /// offered again) is the store's own selection policy.
    fn next_eligible(&self) -> StoreFuture<'_, Result<Option<PersistedTaskRecord>, StoreError>>;

    /// Returns the decoder for the given task kind.
    fn decoder_for(&self, kind: TaskKind) -> Result<Arc<dyn TaskDecoder>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = PersistedTaskRecord::new(TaskKind::ArchiveConvert)
            .with_property("path", "/library/foo.cbr")
            .with_property("delete_original", true);

        assert_eq!(record.kind, TaskKind::ArchiveConvert);
        assert_eq!(
            record.property("path").and_then(Value::as_str),
            Some("/library/foo.cbr")
        );
        assert_eq!(
            record.property("delete_original").and_then(Value::as_bool),
            Some(true)
        );
        assert!(record.property("unknown").is_none());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NoDecoder(TaskKind::Maintenance);
        assert_eq!(
            err.to_string(),
            "no decoder registered for task kind Maintenance"
        );
    }

    #[test]
    fn test_decode_error_missing_property() {
        let err = DecodeError::missing_property(TaskKind::MetadataScrape, "book_id");
        assert_eq!(
            err.to_string(),
            "failed to decode MetadataScrape record: missing property 'book_id'"
        );
    }
}
