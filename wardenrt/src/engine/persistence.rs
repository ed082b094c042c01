//! Optional per-actor snapshot persistence (§4.10 "Actor integration").
//!
//! The engine itself never depends on a concrete storage backend — it only
//! depends on this module's [`SnapshotStore`] trait object, the same way
//! [`crate::engine::monitor::LifecycleSink`] decouples the engine from any
//! particular observer. `wardenrt-persist`'s `StorageAdapter` implementations
//! are adapted to this trait at the call site (see that crate's
//! `PersistentStorageAdapter` wrapper), so `wardenrt` never needs
//! `wardenrt-persist` as a dependency.

use async_trait::async_trait;
use serde_json::Value;

/// An actor's state plus the schema version it was serialized with.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: Value,
    pub schema_version: u32,
}

impl Snapshot {
    pub fn new(state: Value, schema_version: u32) -> Self {
        Self { state, schema_version }
    }
}

/// How often a [`crate::actor::PersistentActor`]'s state is checkpointed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointPolicy {
    /// Checkpoint after every successfully handled call or cast.
    EachMessage,
    /// Checkpoint after every `n`th successfully handled message.
    EveryN(u32),
    /// Never checkpoint automatically; only on `ActorEngine::checkpoint`.
    Manual,
}

/// Object-safe snapshot storage, implemented against a concrete backend
/// (file, memory, SQL — see `wardenrt-persist::storage`) and handed to
/// [`crate::engine::ActorEngine::start_persistent`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, key: &str, snapshot: Snapshot) -> Result<(), SnapshotError>;
    async fn load(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError>;
}

/// Opaque failure from a [`SnapshotStore`] backend, wrapping whatever error
/// type the concrete adapter (e.g. `wardenrt_persist::PersistError`) uses.
#[derive(Debug, thiserror::Error)]
#[error("snapshot store error: {0}")]
pub struct SnapshotError(pub String);

impl SnapshotError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// How a [`crate::engine::ActorEngine::start_persistent`] call is wired to a
/// store.
#[derive(Clone)]
pub struct PersistenceConfig {
    pub store: std::sync::Arc<dyn SnapshotStore>,
    pub policy: CheckpointPolicy,
}

impl PersistenceConfig {
    pub fn new(store: std::sync::Arc<dyn SnapshotStore>, policy: CheckpointPolicy) -> Self {
        Self { store, policy }
    }
}

impl std::fmt::Debug for PersistenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceConfig").field("policy", &self.policy).finish_non_exhaustive()
    }
}
