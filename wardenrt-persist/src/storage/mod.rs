//! Key-value `StorageAdapter` (§4.10): atomic-per-key save/load/delete,
//! with an optional SHA-256 integrity checksum over the persisted state.

pub mod file;
pub mod memory;
pub mod sql;

pub use file::FileStorageAdapter;
pub use memory::MemoryStorageAdapter;
pub use sql::SqlStorageAdapter;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PersistError;

/// Metadata carried alongside every persisted value (§3 "PersistedSnapshot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub persisted_at: DateTime<Utc>,
    pub owner_id: String,
    pub schema_version: u32,
    pub checksum: Option<String>,
}

/// One record as handed to and returned from a [`StorageAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub state: Value,
    pub metadata: SnapshotMetadata,
}

impl PersistedSnapshot {
    pub fn new(state: Value, owner_id: impl Into<String>, schema_version: u32) -> Self {
        Self {
            state,
            metadata: SnapshotMetadata {
                persisted_at: Utc::now(),
                owner_id: owner_id.into(),
                schema_version,
                checksum: None,
            },
        }
    }
}

/// A key-value store for actor snapshots, durable timer entries, and
/// anything else that needs atomic-per-key persistence (§4.10).
///
/// Implementations must guarantee that a concurrent `save` and `load` of the
/// same key never observe a half-written value.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn save(&self, key: &str, snapshot: PersistedSnapshot) -> Result<(), PersistError>;
    async fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>, PersistError>;
    async fn delete(&self, key: &str) -> Result<(), PersistError>;
    async fn exists(&self, key: &str) -> Result<bool, PersistError>;
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, PersistError>;
    /// Remove records whose `persisted_at` is older than `max_age`. Returns
    /// the count removed.
    async fn cleanup(&self, max_age: Duration) -> Result<usize, PersistError>;
    /// Release any resources (file handles, connections) held by this adapter.
    async fn close(&self) -> Result<(), PersistError>;
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
