//! [`TimerService`]: the actor body for §4.9's durable timer service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wardenrt::{Actor, ActorContext, ActorEngine, EngineConfig, Message, StartOptions};

use super::{LiveTimer, TimerEntry, TimerTargetResolver};
use crate::error::{PersistError, TimerError};
use crate::storage::{PersistedSnapshot, StorageAdapter};

/// Requests understood by [`TimerService`]. `Tick` arrives as a `cast` from
/// the companion tick task spawned by [`start`]; everything else arrives as
/// a `call`.
#[derive(Debug, Clone)]
pub enum TimerMessage {
    Schedule { target_key: String, payload: serde_json::Value, delay_ms: u64, repeat_ms: Option<u64> },
    Cancel { id: String },
    Get { id: String },
    GetAll,
    Tick,
}

impl Message for TimerMessage {
    const MESSAGE_TYPE: &'static str = "timer_service";
}

#[derive(Debug, Clone)]
pub enum TimerReply {
    Scheduled(String),
    Cancelled(bool),
    Entry(Option<TimerEntry>),
    Entries(Vec<TimerEntry>),
    Ticked,
}

/// Actor body. Holds live timers in memory, keyed by id, mirrored into
/// `storage` under `"timer:{id}"` so a restart can rehydrate.
pub struct TimerService {
    storage: Arc<dyn StorageAdapter>,
    resolver: TimerTargetResolver,
    entries: HashMap<String, LiveTimer>,
}

impl TimerService {
    pub fn new(storage: Arc<dyn StorageAdapter>, resolver: TimerTargetResolver) -> Self {
        Self { storage, resolver, entries: HashMap::new() }
    }

    async fn persist(&self, entry: &TimerEntry) -> Result<(), PersistError> {
        let snapshot = PersistedSnapshot::new(
            serde_json::to_value(entry).map_err(|err| PersistError::Serialization(err.to_string()))?,
            entry.id.clone(),
            1,
        );
        self.storage.save(&format!("timer:{}", entry.id), snapshot).await
    }

    async fn schedule(
        &mut self,
        target_key: String,
        payload: serde_json::Value,
        delay_ms: u64,
        repeat_ms: Option<u64>,
    ) -> Result<String, TimerError> {
        let Some(target) = (self.resolver)(&target_key) else {
            return Err(TimerError::NotFound(target_key));
        };
        let id = Uuid::new_v4().to_string();
        let entry = TimerEntry {
            id: id.clone(),
            target_key,
            payload,
            fire_at: Utc::now() + chrono::Duration::milliseconds(delay_ms as i64),
            repeat_ms,
        };
        self.persist(&entry).await?;
        self.entries.insert(id.clone(), LiveTimer { entry, target });
        Ok(id)
    }

    async fn cancel(&mut self, id: &str) -> Result<bool, TimerError> {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.storage.delete(&format!("timer:{id}")).await?;
        }
        Ok(removed)
    }

    /// Enumerate due entries, deliver each, then either drop (one-shot) or
    /// realign `fire_at` to `now + repeat_ms` and re-persist (repeating).
    async fn tick(&mut self) -> Result<(), TimerError> {
        let now = Utc::now();
        let due: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, live)| live.entry.fire_at <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in due {
            let Some(live) = self.entries.get(&id) else { continue };
            live.target.deliver(live.entry.payload.clone()).await;

            match live.entry.repeat_ms {
                Some(repeat_ms) => {
                    let mut entry = live.entry.clone();
                    entry.fire_at = now + chrono::Duration::milliseconds(repeat_ms as i64);
                    self.persist(&entry).await?;
                    if let Some(live) = self.entries.get_mut(&id) {
                        live.entry = entry;
                    }
                }
                None => {
                    self.entries.remove(&id);
                    self.storage.delete(&format!("timer:{id}")).await?;
                }
            }
        }
        Ok(())
    }

    /// Read every persisted `timer:*` entry back in, re-resolving its target
    /// and firing overdue ones immediately (repeating timers fire once then
    /// realign to `now + repeat_ms`, matching a fresh `tick`).
    async fn rehydrate(&mut self) -> Result<(), TimerError> {
        for key in self.storage.list_keys(Some("timer:")).await? {
            let Some(snapshot) = self.storage.load(&key).await? else { continue };
            let entry: TimerEntry = serde_json::from_value(snapshot.state)
                .map_err(|err| PersistError::StructuralInvalid(key.clone(), err.to_string()))?;
            let Some(target) = (self.resolver)(&entry.target_key) else {
                tracing::warn!(timer_id = %entry.id, target_key = %entry.target_key, "no resolver for rehydrated timer target, dropping");
                continue;
            };
            self.entries.insert(entry.id.clone(), LiveTimer { entry, target });
        }
        self.tick().await
    }
}

#[async_trait]
impl Actor for TimerService {
    type Message = TimerMessage;
    type Reply = TimerReply;
    type Error = TimerError;

    async fn init(&mut self, _ctx: &ActorContext) -> Result<(), TimerError> {
        self.rehydrate().await
    }

    async fn handle_call(
        &mut self,
        msg: TimerMessage,
        _ctx: &ActorContext,
    ) -> Result<TimerReply, TimerError> {
        match msg {
            TimerMessage::Schedule { target_key, payload, delay_ms, repeat_ms } => {
                let id = self.schedule(target_key, payload, delay_ms, repeat_ms).await?;
                Ok(TimerReply::Scheduled(id))
            }
            TimerMessage::Cancel { id } => Ok(TimerReply::Cancelled(self.cancel(&id).await?)),
            TimerMessage::Get { id } => {
                Ok(TimerReply::Entry(self.entries.get(&id).map(|live| live.entry.clone())))
            }
            TimerMessage::GetAll => Ok(TimerReply::Entries(
                self.entries.values().map(|live| live.entry.clone()).collect(),
            )),
            TimerMessage::Tick => {
                self.tick().await?;
                Ok(TimerReply::Ticked)
            }
        }
    }

    async fn handle_cast(&mut self, msg: TimerMessage, _ctx: &ActorContext) -> Result<(), TimerError> {
        if let TimerMessage::Tick = msg {
            self.tick().await?;
        }
        Ok(())
    }
}

/// Default tick interval (§4.9: "a periodic internal tick (default 1000 ms)").
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

/// Start a `TimerService` and its companion tick task.
///
/// `ActorContext` has no way for an actor to reach its own `ActorEngine`
/// (see `wardenrt::actor::context`), so the periodic tick can't be driven by
/// a self-message loop from inside `init`; instead a plain `tokio::spawn`ed
/// task casts `TimerMessage::Tick` on an interval, exactly like any other
/// external caller holding the engine handle.
pub async fn start(
    storage: Arc<dyn StorageAdapter>,
    resolver: TimerTargetResolver,
    tick_every: Duration,
) -> Result<ActorEngine<TimerService>, wardenrt::EngineError> {
    let engine = ActorEngine::start(
        TimerService::new(storage, resolver),
        StartOptions::new().with_name("timer-service"),
        EngineConfig::default(),
        None,
    )
    .await?;

    let ticker = engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_every);
        loop {
            interval.tick().await;
            if !ticker.is_alive() {
                break;
            }
            ticker.cast(TimerMessage::Tick);
        }
    });

    Ok(engine)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageAdapter;
    use crate::timer::target::EngineTarget;
    use std::sync::atomic::{AtomicU64, Ordering};
    use wardenrt::ActorEngine;

    #[derive(Debug, Clone)]
    struct EchoMsg(u64);

    impl Message for EchoMsg {
        const MESSAGE_TYPE: &'static str = "echo";
    }

    #[derive(Debug, thiserror::Error)]
    #[error("echo error")]
    struct EchoError;

    struct EchoActor {
        received: Arc<AtomicU64>,
    }

    #[async_trait]
    impl Actor for EchoActor {
        type Message = EchoMsg;
        type Reply = ();
        type Error = EchoError;

        async fn handle_call(&mut self, msg: EchoMsg, _ctx: &ActorContext) -> Result<(), EchoError> {
            self.received.store(msg.0, Ordering::SeqCst);
            Ok(())
        }

        async fn handle_cast(&mut self, msg: EchoMsg, _ctx: &ActorContext) -> Result<(), EchoError> {
            self.received.store(msg.0, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn make_resolver() -> (TimerTargetResolver, Arc<AtomicU64>) {
        let received = Arc::new(AtomicU64::new(0));
        let engine = ActorEngine::start(
            EchoActor { received: received.clone() },
            StartOptions::new(),
            EngineConfig::default(),
            None,
        )
        .await
        .expect("start echo");
        let target: Arc<dyn super::super::TimerTarget> =
            Arc::new(EngineTarget::new("echo", engine));
        let resolver: TimerTargetResolver = Arc::new(move |key: &str| {
            if key == "echo" {
                Some(target.clone())
            } else {
                None
            }
        });
        (resolver, received)
    }

    #[tokio::test]
    async fn schedule_then_tick_delivers_and_drops_one_shot() {
        let (resolver, received) = make_resolver().await;
        let storage = Arc::new(MemoryStorageAdapter::new());
        let mut service = TimerService::new(storage, resolver);

        let id = service
            .schedule("echo".to_string(), serde_json::json!({"value": 7}), 0, None)
            .await
            .expect("schedule");
        assert_eq!(service.entries.len(), 1);

        service.tick().await.expect("tick");
        assert!(service.entries.is_empty());
        assert!(service.cancel(&id).await.is_ok());
    }

    #[tokio::test]
    async fn repeating_timer_realigns_instead_of_dropping() {
        let (resolver, _received) = make_resolver().await;
        let storage = Arc::new(MemoryStorageAdapter::new());
        let mut service = TimerService::new(storage, resolver);

        let id = service
            .schedule("echo".to_string(), serde_json::json!({"value": 1}), 0, Some(60_000))
            .await
            .expect("schedule");

        service.tick().await.expect("tick");
        let live = service.entries.get(&id).expect("still present");
        assert!(live.entry.fire_at > Utc::now());
    }

    #[tokio::test]
    async fn cancel_unknown_id_returns_false() {
        let (resolver, _received) = make_resolver().await;
        let storage = Arc::new(MemoryStorageAdapter::new());
        let mut service = TimerService::new(storage, resolver);
        assert!(!service.cancel("nonexistent").await.expect("cancel"));
    }

    #[tokio::test]
    async fn rehydrate_fires_overdue_entries_immediately() {
        let (resolver, received) = make_resolver().await;
        let storage = Arc::new(MemoryStorageAdapter::new());

        let entry = TimerEntry {
            id: "stale".to_string(),
            target_key: "echo".to_string(),
            payload: serde_json::json!({"value": 99}),
            fire_at: Utc::now() - chrono::Duration::seconds(5),
            repeat_ms: None,
        };
        let snapshot = PersistedSnapshot::new(
            serde_json::to_value(&entry).expect("serialize"),
            "stale",
            1,
        );
        storage.save("timer:stale", snapshot).await.expect("save");

        let mut service = TimerService::new(storage, resolver);
        service.rehydrate().await.expect("rehydrate");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(received.load(Ordering::SeqCst), 99);
        assert!(service.entries.is_empty());
    }
}
