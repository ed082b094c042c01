//! Convenient imports for building actors and supervision trees.
//!
//! ```rust,ignore
//! use wardenrt::prelude::*;
//! ```

pub use crate::actor::{Actor, ActorContext, ActorLifecycle, ActorState, TerminationReason};
pub use crate::engine::{
    ActorEngine, ActorHandle, EngineConfig, EngineError, FanOutSink, LifecycleSink, MonitorSink,
    StartOptions,
};
pub use crate::message::{Message, MessagePriority};
pub use crate::monitoring::{
    ActorEvent, ActorEventKind, EventSeverity, InMemoryMonitor, Monitor, MonitoringEvent,
    NoopMonitor, SupervisionEvent,
};
pub use crate::registry::{Registry, RegistryError};
pub use crate::supervisor::{
    ActorChild, AutoShutdown, Child, ChildFactory, ChildId, ChildSpec, RestartIntensity,
    RestartPolicy, Supervisor, SupervisorChild, SupervisorError, SupervisionStrategy,
    SupervisorStart,
};
pub use crate::util::{ActorAddress, ActorId, MessageId, NodeId};
