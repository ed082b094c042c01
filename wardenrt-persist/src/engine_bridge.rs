//! Adapts a [`StorageAdapter`] to `wardenrt::engine::SnapshotStore`, so an
//! actor started with `wardenrt::engine::ActorEngine::start_persistent` can
//! use any backend this crate ships without `wardenrt` itself depending on
//! this crate (§4.10 "Actor integration").

use std::sync::Arc;

use async_trait::async_trait;
use wardenrt::engine::{Snapshot, SnapshotError, SnapshotStore};

use crate::storage::{PersistedSnapshot, StorageAdapter};

/// Wraps any `StorageAdapter` so it can back a persistent actor's
/// checkpointing directly.
pub struct EngineSnapshotStore<S: StorageAdapter + 'static> {
    adapter: Arc<S>,
}

impl<S: StorageAdapter + 'static> EngineSnapshotStore<S> {
    pub fn new(adapter: Arc<S>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<S: StorageAdapter + 'static> SnapshotStore for EngineSnapshotStore<S> {
    async fn save(&self, key: &str, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let persisted = PersistedSnapshot::new(snapshot.state, key, snapshot.schema_version);
        self.adapter
            .save(key, persisted)
            .await
            .map_err(|err| SnapshotError::new(err.to_string()))
    }

    async fn load(&self, key: &str) -> Result<Option<Snapshot>, SnapshotError> {
        match self.adapter.load(key).await {
            Ok(Some(persisted)) => Ok(Some(Snapshot::new(persisted.state, persisted.metadata.schema_version))),
            Ok(None) => Ok(None),
            Err(err) => Err(SnapshotError::new(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageAdapter;

    #[tokio::test]
    async fn round_trips_through_snapshot_store() {
        let store = EngineSnapshotStore::new(Arc::new(MemoryStorageAdapter::new()));
        store
            .save("actor-1", Snapshot::new(serde_json::json!({"count": 3}), 2))
            .await
            .expect("save");
        let loaded = store.load("actor-1").await.expect("load").expect("present");
        assert_eq!(loaded.state, serde_json::json!({"count": 3}));
        assert_eq!(loaded.schema_version, 2);
    }

    #[tokio::test]
    async fn missing_key_loads_none() {
        let store = EngineSnapshotStore::new(Arc::new(MemoryStorageAdapter::new()));
        assert!(store.load("missing").await.expect("load").is_none());
    }
}
