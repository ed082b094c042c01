//! Append-only per-stream event log (§4.10 "EventLogAdapter"): each stream
//! has a dense, monotonic sequence starting at 1, with no gaps and no reuse.

pub mod memory;

pub use memory::MemoryEventLogAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PersistError;

/// One committed record on a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub stream_id: String,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
    pub metadata: Option<Value>,
}

/// An event awaiting assignment of a sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: String,
    pub payload: Value,
    pub metadata: Option<Value>,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self { event_type: event_type.into(), payload, metadata: None }
    }
}

/// Filter/pagination for [`EventLogAdapter::read`].
#[derive(Debug, Clone, Default)]
pub struct ReadQuery {
    pub from_seq: Option<u64>,
    pub to_seq: Option<u64>,
    pub types: Option<Vec<String>>,
    pub limit: Option<usize>,
}

/// An append-only, per-stream event store.
///
/// `append` assigns the next dense sequence number on the named stream;
/// concurrent appends to the same stream must not interleave or skip.
#[async_trait]
pub trait EventLogAdapter: Send + Sync {
    async fn append(&self, stream_id: &str, event: NewEvent) -> Result<EventRecord, PersistError>;
    async fn read(&self, stream_id: &str, query: ReadQuery) -> Result<Vec<EventRecord>, PersistError>;
    async fn read_after(&self, stream_id: &str, seq: u64) -> Result<Vec<EventRecord>, PersistError>;
    async fn last_seq(&self, stream_id: &str) -> Result<Option<u64>, PersistError>;
    async fn truncate_before(&self, stream_id: &str, seq: u64) -> Result<usize, PersistError>;
    async fn list_streams(&self) -> Result<Vec<String>, PersistError>;
}
