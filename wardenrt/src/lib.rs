//! # wardenrt — in-process actor runtime with hierarchical supervision
//!
//! A mailbox-per-actor runtime in the Erlang/OTP tradition: actors exchange
//! `call`/`cast` messages through a strictly-ordered mailbox, and supervisors
//! restart failed children according to one of four standard strategies.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use wardenrt::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug, Clone)]
//! struct Increment;
//!
//! impl Message for Increment {
//!     const MESSAGE_TYPE: &'static str = "increment";
//! }
//!
//! struct Counter(u64);
//!
//! #[async_trait]
//! impl Actor for Counter {
//!     type Message = Increment;
//!     type Reply = u64;
//!     type Error = std::convert::Infallible;
//!
//!     async fn handle_call(&mut self, _msg: Increment, _ctx: &ActorContext) -> Result<u64, Self::Error> {
//!         self.0 += 1;
//!         Ok(self.0)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = ActorEngine::start(Counter(0), StartOptions::new(), EngineConfig::default(), None)
//!         .await
//!         .unwrap();
//!     let count = engine.call(Increment, None).await.unwrap();
//!     assert_eq!(count, 1);
//! }
//! ```
//!
//! # Module organization
//!
//! - [`actor`] — the `Actor` trait, lifecycle state machine, termination reasons
//! - [`engine`] — `ActorEngine`, the per-actor mailbox worker and its config
//! - [`message`] — the `Message` trait and priority metadata
//! - [`registry`] — local name-to-handle binding with crash/terminate auto-cleanup
//! - [`supervisor`] — supervision trees: strategies, restart intensity, dynamic children
//! - [`monitoring`] — structured lifecycle/supervision/system event recording
//! - [`util`] — `ActorId`, `MessageId`, `NodeId`, `ActorAddress`

pub mod actor;
pub mod engine;
pub mod message;
pub mod monitoring;
pub mod prelude;
pub mod registry;
pub mod supervisor;
pub mod util;

pub use actor::{Actor, ActorContext, ActorLifecycle, ActorState, TerminationReason};
pub use engine::{
    ActorEngine, ActorHandle, EngineConfig, EngineError, FanOutSink, LifecycleSink, MonitorSink,
    StartOptions,
};
pub use message::{Message, MessagePriority};
pub use monitoring::{
    ActorEvent, ActorEventKind, BrokerEvent, BrokerEventKind, EventSeverity, InMemoryMonitor,
    MailboxEvent, MailboxEventKind, Monitor, MonitoringConfig, MonitoringError, MonitoringEvent,
    MonitoringSnapshot, NoopMonitor, SupervisionEvent, SupervisionEventKind, SystemEvent,
    SystemEventKind,
};
pub use registry::{Registry, RegistryError};
pub use supervisor::{
    ActorChild, AutoShutdown, Child, ChildFactory, ChildId, ChildSpec, RestartIntensity,
    RestartPolicy, Supervisor, SupervisorChild, SupervisorError, SupervisionStrategy,
    SupervisorStart,
};
pub use util::{ActorAddress, ActorId, MessageId, NodeId};
