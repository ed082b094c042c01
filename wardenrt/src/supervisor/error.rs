//! Supervisor error taxonomy (§7).

use thiserror::Error;

use super::types::ChildId;

/// Failures from [`crate::supervisor::Supervisor`] operations.
#[derive(Debug, Error, Clone)]
pub enum SupervisorError {
    /// `start_child`/supervisor start was given an `id` already present.
    #[error("duplicate child id: {0}")]
    DuplicateChild(ChildId),
    /// `terminate_child`/`restart_child` named an id not in the child list.
    #[error("child not found: {0}")]
    ChildNotFound(ChildId),
    /// A child's `start` factory failed.
    #[error("child {0} failed to start: {1}")]
    ChildStartFailed(ChildId, String),
    /// The sliding restart-intensity window filled up (§4.2).
    #[error("restart intensity exceeded: {max_restarts} restarts within {within_ms}ms")]
    MaxRestartsExceeded { max_restarts: u32, within_ms: u64 },
    /// A child failed to stop within its shutdown timeout.
    #[error("child {0} did not shut down within its timeout")]
    ShutdownTimeout(ChildId),
    /// A running child's `stop` call itself failed (engine-level error).
    #[error("child stop failed: {0}")]
    ChildStopFailed(String),
    /// `start_child` was called on a non-`simple_one_for_one` supervisor.
    #[error("start_child requires a simple_one_for_one supervisor")]
    NotDynamic,
}
