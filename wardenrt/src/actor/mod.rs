//! Actor trait, context and lifecycle state machine.
//!
//! This module defines *what an actor is*; `crate::engine` defines *how it
//! runs* (mailbox, worker task, call/cast/stop).

pub mod context;
pub mod lifecycle;
pub mod reason;
pub mod traits;

pub use context::ActorContext;
pub use lifecycle::{ActorLifecycle, ActorState};
pub use reason::TerminationReason;
pub use traits::{Actor, PersistentActor};
