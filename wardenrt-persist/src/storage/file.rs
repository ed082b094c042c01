//! File-per-key [`StorageAdapter`]: each key is one JSON file, written via
//! temp-file + rename so a reader never observes a half-written value, with
//! an optional SHA-256 checksum over the canonical state encoding.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{hex_encode, PersistedSnapshot, StorageAdapter};
use crate::error::PersistError;

/// Adapter rooted at one directory; `{dir}/{key}.json` holds the record.
pub struct FileStorageAdapter {
    dir: PathBuf,
    checksum: bool,
}

impl FileStorageAdapter {
    /// Create (if needed) `dir` and return an adapter rooted there.
    /// `checksum` enables SHA-256 integrity verification on every `load`.
    pub async fn new(dir: impl Into<PathBuf>, checksum: bool) -> Result<Self, PersistError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(Self { dir, checksum })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn checksum_of(state: &serde_json::Value) -> Result<String, PersistError> {
        let canonical =
            serde_json::to_vec(state).map_err(|err| PersistError::Serialization(err.to_string()))?;
        Ok(hex_encode(&Sha256::digest(&canonical)))
    }

    async fn read_record(path: &Path) -> Result<Option<Vec<u8>>, PersistError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistError::Io(err.to_string())),
        }
    }
}

#[async_trait]
impl StorageAdapter for FileStorageAdapter {
    async fn save(&self, key: &str, mut snapshot: PersistedSnapshot) -> Result<(), PersistError> {
        if self.checksum {
            snapshot.metadata.checksum = Some(Self::checksum_of(&snapshot.state)?);
        }
        let body = serde_json::to_vec(&snapshot)
            .map_err(|err| PersistError::Serialization(err.to_string()))?;

        let tmp_path = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        tokio::fs::rename(&tmp_path, self.path_for(key))
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>, PersistError> {
        let Some(bytes) = Self::read_record(&self.path_for(key)).await? else {
            return Ok(None);
        };
        let snapshot: PersistedSnapshot = serde_json::from_slice(&bytes)
            .map_err(|err| PersistError::StructuralInvalid(key.to_string(), err.to_string()))?;

        if let Some(expected) = &snapshot.metadata.checksum {
            let actual = Self::checksum_of(&snapshot.state)?;
            if &actual != expected {
                return Err(PersistError::CorruptedState(key.to_string()));
            }
        }
        Ok(Some(snapshot))
    }

    async fn delete(&self, key: &str) -> Result<(), PersistError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Io(err.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, PersistError> {
        Ok(tokio::fs::try_exists(self.path_for(key))
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?)
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, PersistError> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        while let Some(entry) = dir.next_entry().await.map_err(|err| PersistError::Io(err.to_string()))? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(key) = name.strip_suffix(".json") else {
                continue;
            };
            if prefix.is_none_or(|p| key.starts_with(p)) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, PersistError> {
        let now = Utc::now();
        let mut removed = 0;
        for key in self.list_keys(None).await? {
            if let Some(snapshot) = self.load(&key).await? {
                let age = now
                    .signed_duration_since(snapshot.metadata.persisted_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if age > max_age {
                    self.delete(&key).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn close(&self) -> Result<(), PersistError> {
        Ok(())
    }
}
