//! Remote-spawn behavior registry (§4.6 "spawn").
//!
//! A `SpawnRequest` names a behavior by string; the accepting node looks it
//! up here to learn how to deserialize `args` and build the concrete
//! `wardenrt::Actor`. Registration happens once at startup, the same shape
//! `wardenrt::supervisor`'s `ChildFactory` closures use for deferred,
//! type-erased construction.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use wardenrt::actor::PersistentActor;
use wardenrt::engine::{LifecycleSink, PersistenceConfig};
use wardenrt::{Actor, ActorEngine, EngineConfig, StartOptions};

use crate::error::RemoteError;
use crate::remote::directory::{DynActor, TypedDynActor};

pub type BehaviorFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn DynActor>, RemoteError>> + Send>>;

/// `(args bytes, optional lifecycle sink) -> a running, type-erased actor`.
pub type BehaviorFactory = Arc<dyn Fn(Vec<u8>, Option<Arc<dyn LifecycleSink>>) -> BehaviorFuture + Send + Sync>;

/// `behaviorName -> BehaviorFactory`, populated once per node at startup.
#[derive(Default)]
pub struct BehaviorRegistry {
    factories: DashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior under `name` using a plain constructor
    /// `Args -> A`; wraps it into the boxed-future factory shape the
    /// directory stores, and starts the actor with default engine config.
    pub fn register_fn<A, Args, F>(&self, name: impl Into<String>, ctor: F)
    where
        A: Actor,
        A::Message: Serialize + DeserializeOwned,
        A::Reply: Serialize + DeserializeOwned,
        Args: DeserializeOwned + Send + 'static,
        F: Fn(Args) -> A + Send + Sync + 'static,
    {
        let ctor = Arc::new(ctor);
        let factory: BehaviorFactory = Arc::new(move |args_bytes, sink| {
            let ctor = Arc::clone(&ctor);
            Box::pin(async move {
                let args: Args = serde_cbor::from_slice(&args_bytes)
                    .map_err(|err| RemoteError::SpawnFailed(err.to_string()))?;
                let behavior = ctor(args);
                let engine = ActorEngine::start(behavior, StartOptions::new(), EngineConfig::default(), sink)
                    .await
                    .map_err(|err| RemoteError::SpawnFailed(err.to_string()))?;
                Ok(Arc::new(TypedDynActor::new(engine)) as Arc<dyn DynActor>)
            })
        });
        self.factories.insert(name.into(), factory);
    }

    /// Register a snapshot-backed behavior (§4.10 "snapshot-backed remote
    /// actors"): the same constructor shape as `register_fn`, but the actor
    /// is started with `ActorEngine::start_persistent` against `persistence`,
    /// so its state is restored on spawn and checkpointed per
    /// `persistence.policy` thereafter. `wardenrt_persist::EngineSnapshotStore`
    /// adapts any `StorageAdapter` into the `persistence.store` this expects.
    pub fn register_persistent_fn<A, Args, F>(
        &self,
        name: impl Into<String>,
        ctor: F,
        persistence: PersistenceConfig,
    ) where
        A: PersistentActor,
        A::Message: Serialize + DeserializeOwned,
        A::Reply: Serialize + DeserializeOwned,
        Args: DeserializeOwned + Send + 'static,
        F: Fn(Args) -> A + Send + Sync + 'static,
    {
        let ctor = Arc::new(ctor);
        let factory: BehaviorFactory = Arc::new(move |args_bytes, sink| {
            let ctor = Arc::clone(&ctor);
            let persistence = persistence.clone();
            Box::pin(async move {
                let args: Args = serde_cbor::from_slice(&args_bytes)
                    .map_err(|err| RemoteError::SpawnFailed(err.to_string()))?;
                let behavior = ctor(args);
                let engine = ActorEngine::start_persistent(
                    behavior,
                    StartOptions::new(),
                    EngineConfig::default(),
                    sink,
                    persistence,
                )
                .await
                .map_err(|err| RemoteError::SpawnFailed(err.to_string()))?;
                Ok(Arc::new(TypedDynActor::new(engine)) as Arc<dyn DynActor>)
            })
        });
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Spawn the behavior registered under `name`, decoding `args` and
    /// running the registered constructor plus `ActorEngine::start`.
    pub async fn spawn(
        &self,
        name: &str,
        args: Vec<u8>,
        sink: Option<Arc<dyn LifecycleSink>>,
    ) -> Result<Arc<dyn DynActor>, RemoteError> {
        let factory = self
            .factories
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RemoteError::BehaviorNotFound(name.to_string()))?;
        factory(args, sink).await
    }
}
