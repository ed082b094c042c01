//! Engine-level error taxonomy (§7).

use thiserror::Error;

/// Failures surfaced by [`crate::engine::ActorEngine`] operations.
///
/// These are the engine's slice of the system-wide error taxonomy; the
/// registry, supervisor, persistence and cluster crates each define their
/// own enums for their own slice rather than growing this one without
/// bound.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// `init` returned an error during `start`.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// The target actor is not alive (never started, already stopped, or crashed).
    #[error("server not running")]
    ServerNotRunning,

    /// A `call`'s deadline elapsed before a reply arrived.
    #[error("call timed out")]
    CallTimeout,

    /// The actor crashed while a call to it was in flight.
    #[error("server crashed while handling call")]
    ServerCrashed,

    /// `terminate` did not complete within the shutdown timeout; the actor
    /// was force-terminated.
    #[error("shutdown did not complete within the timeout")]
    ShutdownTimeout,

    /// A snapshot existed but its `schema_version` could not be restored by
    /// `PersistentActor::restore_state` (§4.10).
    #[error("persisted state is incompatible with the current schema: {0}")]
    StateRestoreIncompatible(String),

    /// The `SnapshotStore` backing a persistent actor failed on load, save,
    /// or checkpoint.
    #[error("snapshot store failed: {0}")]
    SnapshotStoreFailed(String),
}
