//! The actor engine: mailbox, worker task, call/cast/stop, lifecycle events.
//!
//! This is the completion of the teacher's `ActorSystem` design-note
//! ("an `ActorSystem` will eventually own workers") — `ActorEngine<A>` owns
//! the worker-spawning logic directly instead of routing through a generic
//! `MessageBroker<M>` indirection, because a supervisor's ordered child
//! list needs to hold actors of unrelated `Behavior` types side by side
//! (see `crate::supervisor`), which a broker type parameter threaded
//! through every actor would prevent.

pub mod actor_engine;
pub mod config;
pub mod error;
pub(crate) mod mailbox;
pub mod monitor;
pub mod options;
pub mod persistence;

pub use actor_engine::{ActorEngine, ActorHandle};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::EngineError;
pub use monitor::{FanOutSink, LifecycleSink, MonitorSink};
pub use options::StartOptions;
pub use persistence::{CheckpointPolicy, PersistenceConfig, Snapshot, SnapshotError, SnapshotStore};
