//! In-memory [`EventLogAdapter`], one `Mutex<Vec<EventRecord>>` per stream so
//! appends on the same stream serialize while different streams don't.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{EventLogAdapter, EventRecord, NewEvent, ReadQuery};
use crate::error::PersistError;

#[derive(Default)]
pub struct MemoryEventLogAdapter {
    streams: DashMap<String, Mutex<Vec<EventRecord>>>,
}

impl MemoryEventLogAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventLogAdapter for MemoryEventLogAdapter {
    async fn append(&self, stream_id: &str, event: NewEvent) -> Result<EventRecord, PersistError> {
        let stream = self
            .streams
            .entry(stream_id.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut records = stream.lock();
        let seq = records.last().map(|r| r.seq + 1).unwrap_or(1);
        let record = EventRecord {
            stream_id: stream_id.to_string(),
            seq,
            timestamp: Utc::now(),
            event_type: event.event_type,
            payload: event.payload,
            metadata: event.metadata,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn read(&self, stream_id: &str, query: ReadQuery) -> Result<Vec<EventRecord>, PersistError> {
        let Some(stream) = self.streams.get(stream_id) else {
            return Ok(Vec::new());
        };
        let records = stream.lock();
        let mut out: Vec<EventRecord> = records
            .iter()
            .filter(|r| query.from_seq.is_none_or(|from| r.seq >= from))
            .filter(|r| query.to_seq.is_none_or(|to| r.seq <= to))
            .filter(|r| {
                query
                    .types
                    .as_ref()
                    .is_none_or(|types| types.iter().any(|t| t == &r.event_type))
            })
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn read_after(&self, stream_id: &str, seq: u64) -> Result<Vec<EventRecord>, PersistError> {
        self.read(
            stream_id,
            ReadQuery { from_seq: Some(seq + 1), ..Default::default() },
        )
        .await
    }

    async fn last_seq(&self, stream_id: &str) -> Result<Option<u64>, PersistError> {
        Ok(self
            .streams
            .get(stream_id)
            .and_then(|stream| stream.lock().last().map(|r| r.seq)))
    }

    async fn truncate_before(&self, stream_id: &str, seq: u64) -> Result<usize, PersistError> {
        let Some(stream) = self.streams.get(stream_id) else {
            return Ok(0);
        };
        let mut records = stream.lock();
        let before = records.len();
        records.retain(|r| r.seq >= seq);
        Ok(before - records.len())
    }

    async fn list_streams(&self) -> Result<Vec<String>, PersistError> {
        Ok(self.streams.iter().map(|entry| entry.key().clone()).collect())
    }
}
