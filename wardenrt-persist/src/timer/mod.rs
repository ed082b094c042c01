//! Durable timer service (§4.9): built as an actor so it restarts and
//! supervises exactly like any other child, with entries persisted through a
//! [`StorageAdapter`] so a process restart rehydrates pending fires.

mod service;
mod target;

pub use service::{start, TimerMessage, TimerReply, TimerService, DEFAULT_TICK};
pub use target::{EngineTarget, TimerTarget};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A scheduled fire, as persisted under key `"timer:{id}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEntry {
    pub id: String,
    pub target_key: String,
    pub payload: serde_json::Value,
    pub fire_at: DateTime<Utc>,
    pub repeat_ms: Option<u64>,
}

/// Live, in-memory half of a scheduled timer: the persisted [`TimerEntry`]
/// plus the resolved delivery target, which can't itself be persisted.
#[derive(Clone)]
pub struct LiveTimer {
    pub entry: TimerEntry,
    pub target: Arc<dyn TimerTarget>,
}

/// Looks up the live [`TimerTarget`] for a `target_key` read back out of
/// storage. Registered once per actor type at `TimerService` construction,
/// since a `TimerEntry` alone can't carry a trait object across a restart.
pub type TimerTargetResolver = Arc<dyn Fn(&str) -> Option<Arc<dyn TimerTarget>> + Send + Sync>;
