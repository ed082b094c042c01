//! SQL-backed [`StorageAdapter`] (§4.10): one row per key in a single
//! table, backed by `sqlx`'s SQLite driver. Atomicity per key comes from
//! SQLite's own transaction guarantees on a single `INSERT ... ON CONFLICT`
//! statement rather than a temp-file dance, mirroring how
//! [`super::file::FileStorageAdapter`] leans on rename atomicity instead.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Row, SqlitePool};

use super::{hex_encode, PersistedSnapshot, SnapshotMetadata, StorageAdapter};
use crate::error::PersistError;

/// Adapter backed by a single `wardenrt_snapshots` table, one row per key.
pub struct SqlStorageAdapter {
    pool: SqlitePool,
    checksum: bool,
}

#[derive(FromRow)]
struct SnapshotRow {
    state: String,
    persisted_at: DateTime<Utc>,
    owner_id: String,
    schema_version: i64,
    checksum: Option<String>,
}

impl SqlStorageAdapter {
    /// Connect to `database_url` (e.g. `sqlite://path/to/db.sqlite` or
    /// `sqlite::memory:`), creating the backing table if absent.
    /// `checksum` enables SHA-256 integrity verification on every `load`.
    pub async fn connect(database_url: &str, checksum: bool) -> Result<Self, PersistError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS wardenrt_snapshots (
                key TEXT PRIMARY KEY NOT NULL,
                state TEXT NOT NULL,
                persisted_at TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                checksum TEXT
            )",
        )
        .execute(&pool)
        .await
        .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(Self { pool, checksum })
    }

    fn checksum_of(state: &serde_json::Value) -> Result<String, PersistError> {
        let canonical =
            serde_json::to_vec(state).map_err(|err| PersistError::Serialization(err.to_string()))?;
        Ok(hex_encode(&Sha256::digest(&canonical)))
    }
}

#[async_trait]
impl StorageAdapter for SqlStorageAdapter {
    async fn save(&self, key: &str, mut snapshot: PersistedSnapshot) -> Result<(), PersistError> {
        if self.checksum {
            snapshot.metadata.checksum = Some(Self::checksum_of(&snapshot.state)?);
        }
        let state = serde_json::to_string(&snapshot.state)
            .map_err(|err| PersistError::Serialization(err.to_string()))?;

        sqlx::query(
            "INSERT INTO wardenrt_snapshots (key, state, persisted_at, owner_id, schema_version, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(key) DO UPDATE SET
                state = excluded.state,
                persisted_at = excluded.persisted_at,
                owner_id = excluded.owner_id,
                schema_version = excluded.schema_version,
                checksum = excluded.checksum",
        )
        .bind(key)
        .bind(state)
        .bind(snapshot.metadata.persisted_at)
        .bind(&snapshot.metadata.owner_id)
        .bind(snapshot.metadata.schema_version as i64)
        .bind(&snapshot.metadata.checksum)
        .execute(&self.pool)
        .await
        .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedSnapshot>, PersistError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT state, persisted_at, owner_id, schema_version, checksum
             FROM wardenrt_snapshots WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| PersistError::Io(err.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        let state: serde_json::Value = serde_json::from_str(&row.state)
            .map_err(|err| PersistError::StructuralInvalid(key.to_string(), err.to_string()))?;

        if let Some(expected) = &row.checksum {
            let actual = Self::checksum_of(&state)?;
            if &actual != expected {
                return Err(PersistError::CorruptedState(key.to_string()));
            }
        }

        Ok(Some(PersistedSnapshot {
            state,
            metadata: SnapshotMetadata {
                persisted_at: row.persisted_at,
                owner_id: row.owner_id,
                schema_version: row.schema_version as u32,
                checksum: row.checksum,
            },
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), PersistError> {
        sqlx::query("DELETE FROM wardenrt_snapshots WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, PersistError> {
        let row = sqlx::query("SELECT 1 FROM wardenrt_snapshots WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(row.is_some())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, PersistError> {
        let rows = match prefix {
            Some(prefix) => sqlx::query("SELECT key FROM wardenrt_snapshots WHERE key LIKE ?1")
                .bind(format!("{prefix}%"))
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT key FROM wardenrt_snapshots").fetch_all(&self.pool).await,
        }
        .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(rows.into_iter().map(|row| row.get::<String, _>("key")).collect())
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, PersistError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let result = sqlx::query("DELETE FROM wardenrt_snapshots WHERE persisted_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|err| PersistError::Io(err.to_string()))?;
        Ok(result.rows_affected() as usize)
    }

    async fn close(&self) -> Result<(), PersistError> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    async fn adapter(checksum: bool) -> SqlStorageAdapter {
        SqlStorageAdapter::connect("sqlite::memory:", checksum).await.unwrap()
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let adapter = adapter(true).await;
        let snapshot = PersistedSnapshot::new(serde_json::json!({"n": 42}), "owner", 1);
        adapter.save("k1", snapshot).await.unwrap();
        let loaded = adapter.load("k1").await.unwrap().unwrap();
        assert_eq!(loaded.state, serde_json::json!({"n": 42}));
        assert!(loaded.metadata.checksum.is_some());
    }

    #[tokio::test]
    async fn save_is_an_upsert() {
        let adapter = adapter(false).await;
        adapter.save("k1", PersistedSnapshot::new(serde_json::json!(1), "owner", 1)).await.unwrap();
        adapter.save("k1", PersistedSnapshot::new(serde_json::json!(2), "owner", 2)).await.unwrap();
        let loaded = adapter.load("k1").await.unwrap().unwrap();
        assert_eq!(loaded.state, serde_json::json!(2));
        assert_eq!(loaded.metadata.schema_version, 2);
    }

    #[tokio::test]
    async fn corrupted_checksum_fails_load_without_mutating() {
        let adapter = adapter(true).await;
        adapter.save("k1", PersistedSnapshot::new(serde_json::json!({"n": 1}), "owner", 1)).await.unwrap();
        sqlx::query("UPDATE wardenrt_snapshots SET checksum = 'deadbeef' WHERE key = 'k1'")
            .execute(&adapter.pool)
            .await
            .unwrap();

        let err = adapter.load("k1").await.unwrap_err();
        assert!(matches!(err, PersistError::CorruptedState(_)));
        // The row itself is untouched by a failed load.
        let row_exists = adapter.exists("k1").await.unwrap();
        assert!(row_exists);
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let adapter = adapter(false).await;
        assert!(adapter.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let adapter = adapter(false).await;
        adapter.save("timer:a", PersistedSnapshot::new(serde_json::json!(1), "x", 1)).await.unwrap();
        adapter.save("actor:b", PersistedSnapshot::new(serde_json::json!(2), "x", 1)).await.unwrap();
        let keys = adapter.list_keys(Some("timer:")).await.unwrap();
        assert_eq!(keys, vec!["timer:a".to_string()]);
    }

    #[tokio::test]
    async fn delete_then_exists_is_false() {
        let adapter = adapter(false).await;
        adapter.save("k1", PersistedSnapshot::new(serde_json::json!(1), "x", 1)).await.unwrap();
        adapter.delete("k1").await.unwrap();
        assert!(!adapter.exists("k1").await.unwrap());
    }
}
