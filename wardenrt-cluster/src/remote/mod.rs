//! Remote call/cast/spawn/monitor (§4.6): the type-erased dispatch layer
//! that lets a wire frame reach a statically-typed `wardenrt::Actor`.

pub mod behavior_registry;
pub mod directory;
pub mod monitor;
pub mod router;

pub use behavior_registry::{BehaviorFactory, BehaviorRegistry};
pub use directory::{ActorDirectory, DynActor, TypedDynActor};
pub use monitor::{LocalWatchers, PendingMonitors};
pub use router::RemoteRouter;
