//! In-memory [`StorageAdapter`]: default for tests and for configurations
//! that don't need durability across process restarts.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{PersistedSnapshot, StorageAdapter};
use crate::error::PersistError;

/// `DashMap`-backed adapter, following the same concurrent-map idiom as
/// [`wardenrt::registry::Registry`]'s binding table. Each key's shard lock
/// gives the atomic-per-key guarantee §4.10 requires.
#[derive(Default)]
pub struct MemoryStorageAdapter {
    entries: DashMap<String, PersistedSnapshot>,
}

impl MemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorageAdapter {
    async fn save(&self, key: &str, snapshot: PersistedSnapshot) -> Result<(), PersistError> {
        self.entries.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>, PersistError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), PersistError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.entries.contains_key(key))
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, PersistError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
            .collect())
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, PersistError> {
        let now = Utc::now();
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                now.signed_duration_since(entry.value().metadata.persisted_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO)
                    > max_age
            })
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.entries.remove(key);
        }
        Ok(stale.len())
    }

    async fn close(&self) -> Result<(), PersistError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let adapter = MemoryStorageAdapter::new();
        let snapshot = PersistedSnapshot::new(serde_json::json!({"count": 1}), "actor-1", 1);
        adapter.save("key-1", snapshot).await.expect("save");
        let loaded = adapter.load("key-1").await.expect("load").expect("present");
        assert_eq!(loaded.state, serde_json::json!({"count": 1}));
    }

    #[tokio::test]
    async fn delete_then_load_returns_none() {
        let adapter = MemoryStorageAdapter::new();
        let snapshot = PersistedSnapshot::new(serde_json::json!(null), "actor-1", 1);
        adapter.save("key-1", snapshot).await.expect("save");
        adapter.delete("key-1").await.expect("delete");
        assert!(adapter.load("key-1").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let adapter = MemoryStorageAdapter::new();
        adapter
            .save("timer:a", PersistedSnapshot::new(serde_json::json!(1), "x", 1))
            .await
            .expect("save");
        adapter
            .save("actor:b", PersistedSnapshot::new(serde_json::json!(2), "x", 1))
            .await
            .expect("save");
        let mut keys = adapter.list_keys(Some("timer:")).await.expect("list");
        keys.sort();
        assert_eq!(keys, vec!["timer:a".to_string()]);
    }

    #[tokio::test]
    async fn cleanup_removes_entries_older_than_max_age() {
        let adapter = MemoryStorageAdapter::new();
        let mut snapshot = PersistedSnapshot::new(serde_json::json!(1), "x", 1);
        snapshot.metadata.persisted_at = Utc::now() - chrono::Duration::seconds(120);
        adapter.save("old", snapshot).await.expect("save");
        adapter
            .save("fresh", PersistedSnapshot::new(serde_json::json!(2), "x", 1))
            .await
            .expect("save");

        let removed = adapter.cleanup(Duration::from_secs(60)).await.expect("cleanup");
        assert_eq!(removed, 1);
        assert!(adapter.load("old").await.expect("load").is_none());
        assert!(adapter.load("fresh").await.expect("load").is_some());
    }
}
