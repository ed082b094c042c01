//! Persistence and timer error taxonomy (§7).

use thiserror::Error;

/// Failures from [`crate::storage::StorageAdapter`] and
/// [`crate::eventlog::EventLogAdapter`] operations.
#[derive(Debug, Error, Clone)]
pub enum PersistError {
    /// `load` found a record whose checksum didn't match its payload.
    #[error("corrupted state for key {0}: checksum mismatch")]
    CorruptedState(String),
    /// `load` found a record that didn't deserialize to the expected shape.
    #[error("corrupted state for key {0}: {1}")]
    StructuralInvalid(String, String),
    /// `load`/`delete`/`exists` named a key with no record.
    #[error("no record for key {0}")]
    NotFound(String),
    /// A filesystem operation on the backing store failed.
    #[error("storage io error: {0}")]
    Io(String),
    /// A value could not be serialized for storage.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// `readAfter`/`truncateBefore` named a sequence number not on the stream.
    #[error("sequence {seq} not found on stream {stream_id}")]
    SequenceNotFound { stream_id: String, seq: u64 },
}

/// Failures from [`crate::timer::TimerService`] operations.
#[derive(Debug, Error, Clone)]
pub enum TimerError {
    /// `cancel`/`get` named an id with no matching entry.
    #[error("no timer with id {0}")]
    NotFound(String),
    /// The configured storage adapter failed while scheduling or ticking.
    #[error("timer persistence failed: {0}")]
    Persist(#[from] PersistError),
}
