//! Storage adapters, an append-only event log, and the durable timer
//! service (§4.9, §4.10): the persistence layer actors opt into on top of
//! `wardenrt`'s engine/supervisor vocabulary.

pub mod engine_bridge;
pub mod error;
pub mod eventlog;
pub mod storage;
pub mod timer;

pub use engine_bridge::EngineSnapshotStore;
pub use error::{PersistError, TimerError};
pub use eventlog::{EventLogAdapter, EventRecord, MemoryEventLogAdapter, NewEvent, ReadQuery};
pub use storage::{
    FileStorageAdapter, MemoryStorageAdapter, PersistedSnapshot, SnapshotMetadata, SqlStorageAdapter,
    StorageAdapter,
};
pub use timer::{
    start as start_timer_service, EngineTarget, TimerEntry, TimerMessage, TimerReply, TimerService,
    TimerTarget, TimerTargetResolver, DEFAULT_TICK,
};
