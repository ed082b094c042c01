//! Type-erased local actor dispatch for remote traffic (§4.6).
//!
//! `wardenrt::engine::ActorEngine<A>` is generic per behavior, but an
//! incoming `Call`/`Cast` frame only carries an `ActorId` and CBOR-encoded
//! bytes — the cluster layer has no static `A` to hand the engine. Every
//! engine this node exposes remotely is wrapped in a [`TypedDynActor`],
//! which closes over `A` and exposes the object-safe [`DynActor`] the
//! directory stores by id, the same "type-erase at the edge, stay typed
//! inside" shape `wardenrt::supervisor::child::Child` uses for the
//! supervisor's child list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use wardenrt::engine::{ActorHandle, EngineError, LifecycleSink};
use wardenrt::monitoring::ActorEventKind;
use wardenrt::util::ActorId;
use wardenrt::{Actor, ActorEngine};

use crate::error::RemoteError;

/// Object-safe facade over one running, remotely-addressable actor.
#[async_trait]
pub trait DynActor: Send + Sync {
    async fn dyn_call(&self, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, RemoteError>;
    fn dyn_cast(&self, payload: Vec<u8>) -> Result<(), RemoteError>;
    async fn dyn_stop(&self, reason: String, timeout: Duration) -> Result<(), RemoteError>;
    fn handle(&self) -> ActorHandle;
    fn is_alive(&self) -> bool;
}

/// Wraps a concrete `ActorEngine<A>` so it can be stored behind `dyn DynActor`.
pub struct TypedDynActor<A: Actor> {
    engine: ActorEngine<A>,
}

impl<A: Actor> TypedDynActor<A> {
    pub fn new(engine: ActorEngine<A>) -> Self {
        Self { engine }
    }
}

fn map_engine_error(err: EngineError) -> RemoteError {
    match err {
        EngineError::ServerNotRunning => RemoteError::ServerNotRunning,
        EngineError::CallTimeout => RemoteError::CallTimeout,
        EngineError::ServerCrashed => RemoteError::ServerCrashed,
        other => RemoteError::Unknown(other.to_string()),
    }
}

#[async_trait]
impl<A> DynActor for TypedDynActor<A>
where
    A: Actor,
    A::Message: Serialize + DeserializeOwned,
    A::Reply: Serialize + DeserializeOwned,
{
    async fn dyn_call(&self, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, RemoteError> {
        let msg: A::Message =
            serde_cbor::from_slice(&payload).map_err(|err| RemoteError::Unknown(err.to_string()))?;
        let reply = self.engine.call(msg, Some(timeout)).await.map_err(map_engine_error)?;
        serde_cbor::to_vec(&reply).map_err(|err| RemoteError::Unknown(err.to_string()))
    }

    fn dyn_cast(&self, payload: Vec<u8>) -> Result<(), RemoteError> {
        let msg: A::Message =
            serde_cbor::from_slice(&payload).map_err(|err| RemoteError::Unknown(err.to_string()))?;
        self.engine.cast(msg);
        Ok(())
    }

    async fn dyn_stop(&self, reason: String, timeout: Duration) -> Result<(), RemoteError> {
        self.engine.stop(reason, Some(timeout)).await.map_err(map_engine_error)
    }

    fn handle(&self) -> ActorHandle {
        self.engine.handle().clone()
    }

    fn is_alive(&self) -> bool {
        self.engine.is_alive()
    }
}

/// `ActorId -> dyn DynActor` for every actor on this node reachable from
/// remote `Call`/`Cast`/`monitor` traffic. Removes its own entry on
/// termination by implementing [`LifecycleSink`], the same auto-cleanup
/// shape `wardenrt::registry::Registry` uses for names.
#[derive(Default)]
pub struct ActorDirectory {
    by_id: DashMap<ActorId, Arc<dyn DynActor>>,
}

impl ActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `actor` to remote callers under its own id.
    pub fn insert(&self, actor: Arc<dyn DynActor>) {
        self.by_id.insert(*actor.handle().id(), actor);
    }

    pub fn get(&self, id: &ActorId) -> Option<Arc<dyn DynActor>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, id: &ActorId) {
        self.by_id.remove(id);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[async_trait]
impl LifecycleSink for ActorDirectory {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        if matches!(kind, ActorEventKind::Terminated { .. } | ActorEventKind::Crashed { .. }) {
            self.remove(&actor_id);
        }
    }
}
