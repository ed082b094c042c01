//! `ActorEngine`: one Tokio task per actor, pulling its mailbox strictly in
//! order and enforcing the single-writer/no-overlap invariant by
//! construction (a single task body can't run two iterations concurrently).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::actor::{Actor, ActorContext, PersistentActor, TerminationReason};
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::mailbox::MailboxItem;
use crate::engine::monitor::LifecycleSink;
use crate::engine::options::StartOptions;
use crate::engine::persistence::{CheckpointPolicy, PersistenceConfig, Snapshot};
use crate::monitoring::ActorEventKind;
use crate::util::ActorAddress;

/// The wire-level opaque identifier from §3: an address is local when
/// `node_id` is `None`. `ActorAddress` already has exactly this shape, so
/// `ActorHandle` is simply its name at the engine's call/cast/stop surface.
pub type ActorHandle = ActorAddress;

/// A running actor: a handle plus the sending half of its mailbox.
///
/// Cheap to clone (an `mpsc::Sender` clone and two `Arc` clones); every
/// holder of a clone can `call`/`cast`/`stop` the same actor.
pub struct ActorEngine<A: Actor> {
    handle: ActorHandle,
    tx: mpsc::Sender<MailboxItem<A>>,
    alive: Arc<AtomicBool>,
    abort: AbortHandle,
    config: EngineConfig,
}

impl<A: Actor> Clone for ActorEngine<A> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            tx: self.tx.clone(),
            alive: Arc::clone(&self.alive),
            abort: self.abort.clone(),
            config: self.config.clone(),
        }
    }
}

impl<A: Actor> ActorEngine<A> {
    /// Start `behavior`: registers a mailbox, runs `init` to completion, and
    /// only then spawns the worker task. Returns after `init` completes,
    /// success or failure — on failure no task is spawned and no handle
    /// leaks, per §4.1.
    pub async fn start(
        mut behavior: A,
        options: StartOptions,
        config: EngineConfig,
        monitor: Option<Arc<dyn LifecycleSink>>,
    ) -> Result<Self, EngineError> {
        let handle = match &options.name {
            Some(name) => ActorAddress::named(name.clone()),
            None => ActorAddress::anonymous(),
        };
        let ctx = ActorContext::new(handle.clone());

        if let Err(err) = behavior.init(&ctx).await {
            if let Some(sink) = &monitor {
                sink.emit(
                    *handle.id(),
                    ActorEventKind::Crashed {
                        error: err.to_string(),
                    },
                )
                .await;
            }
            return Err(EngineError::InitializationFailed(err.to_string()));
        }

        if let Some(sink) = &monitor {
            sink.emit(*handle.id(), ActorEventKind::Started).await;
        }

        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let alive = Arc::new(AtomicBool::new(true));

        let worker_handle = handle.clone();
        let worker_alive = Arc::clone(&alive);
        let join = tokio::spawn(Self::run_worker(
            behavior,
            ctx,
            rx,
            worker_alive,
            worker_handle,
            monitor,
        ));
        let abort = join.abort_handle();

        Ok(Self {
            handle,
            tx,
            alive,
            abort,
            config,
        })
    }

    /// This actor's handle.
    pub fn handle(&self) -> &ActorHandle {
        &self.handle
    }

    /// `true` unless the actor has stopped or crashed.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Synchronous call: enqueues and awaits the reply or `timeout`
    /// (default §4.1: 5000ms). A caller whose deadline elapses cancels only
    /// its own waiter — the actor still processes the call and the state
    /// change still applies; a subsequent late reply is simply discarded
    /// because nothing is left to receive it.
    pub async fn call(&self, msg: A::Message, timeout: Option<Duration>) -> Result<A::Reply, EngineError> {
        if !self.is_alive() {
            return Err(EngineError::ServerNotRunning);
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        let item = MailboxItem::Call {
            msg,
            corr_id: Uuid::new_v4(),
            reply_tx,
        };
        if self.tx.send(item).await.is_err() {
            return Err(EngineError::ServerNotRunning);
        }
        let deadline = timeout.unwrap_or(self.config.default_call_timeout);
        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_recv_dropped)) => Err(EngineError::ServerCrashed),
            Err(_elapsed) => Err(EngineError::CallTimeout),
        }
    }

    /// Fire-and-forget cast. Never blocks, never fails on a stopped actor —
    /// it is silently dropped with a trace event, per §4.1. Uses
    /// `try_send` rather than a blocking send so a full mailbox can't stall
    /// the caller either; a full mailbox drops with a `warn` event instead.
    pub fn cast(&self, msg: A::Message) {
        if !self.is_alive() {
            tracing::trace!(actor = %self.handle, "cast dropped: actor not running");
            return;
        }
        match self.tx.try_send(MailboxItem::Cast { msg }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::trace!(actor = %self.handle, "cast dropped: mailbox closed");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(actor = %self.handle, "cast dropped: mailbox full");
            }
        }
    }

    /// Request a stop and wait for `terminate` plus worker exit, up to
    /// `timeout` (default §4.1: 5000ms). If exceeded, force-terminates the
    /// worker task and reports `ShutdownTimeout`. Idempotent: stopping an
    /// already-stopped actor is a no-op `Ok(())`.
    pub async fn stop(&self, reason: impl Into<String>, timeout: Option<Duration>) -> Result<(), EngineError> {
        if !self.is_alive() {
            return Ok(());
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        let item = MailboxItem::Stop {
            reason: TerminationReason::Stopped(reason.into()),
            ack: ack_tx,
        };
        if self.tx.send(item).await.is_err() {
            return Ok(());
        }
        let deadline = timeout.unwrap_or(self.config.default_shutdown_timeout);
        match tokio::time::timeout(deadline, ack_rx).await {
            Ok(_) => Ok(()),
            Err(_elapsed) => {
                self.abort.abort();
                self.alive.store(false, Ordering::Release);
                Err(EngineError::ShutdownTimeout)
            }
        }
    }

    async fn run_worker(
        mut behavior: A,
        ctx: ActorContext,
        mut rx: mpsc::Receiver<MailboxItem<A>>,
        alive: Arc<AtomicBool>,
        handle: ActorHandle,
        monitor: Option<Arc<dyn LifecycleSink>>,
    ) {
        while let Some(item) = rx.recv().await {
            match item {
                MailboxItem::Call { msg, reply_tx, .. } => match behavior.handle_call(msg, &ctx).await {
                    Ok(reply) => {
                        let _ = reply_tx.send(Ok(reply));
                    }
                    Err(err) => {
                        let _ = reply_tx.send(Err(EngineError::ServerCrashed));
                        Self::crash(&mut behavior, &ctx, &alive, &handle, &monitor, err).await;
                        return;
                    }
                },
                MailboxItem::Cast { msg } => {
                    if let Err(err) = behavior.handle_cast(msg, &ctx).await {
                        Self::crash(&mut behavior, &ctx, &alive, &handle, &monitor, err).await;
                        return;
                    }
                }
                MailboxItem::Stop { reason, ack } => {
                    behavior.terminate(&reason, &ctx).await;
                    alive.store(false, Ordering::Release);
                    if let Some(sink) = &monitor {
                        sink.emit(
                            *handle.id(),
                            ActorEventKind::Terminated {
                                reason: reason.to_string(),
                            },
                        )
                        .await;
                    }
                    let _ = ack.send(());
                    return;
                }
                MailboxItem::Checkpoint { ack } => {
                    let _ = ack.send(Err(EngineError::SnapshotStoreFailed(
                        "actor was not started with start_persistent".into(),
                    )));
                }
            }
        }
        // Mailbox sender side dropped (all `ActorEngine` clones gone) without
        // an explicit stop: treat as a normal exit.
        if alive.swap(false, Ordering::AcqRel) {
            behavior.terminate(&TerminationReason::Normal, &ctx).await;
            if let Some(sink) = &monitor {
                sink.emit(*handle.id(), ActorEventKind::Terminated { reason: "normal".into() })
                    .await;
            }
        }
    }

    async fn crash(
        behavior: &mut A,
        ctx: &ActorContext,
        alive: &Arc<AtomicBool>,
        handle: &ActorHandle,
        monitor: &Option<Arc<dyn LifecycleSink>>,
        err: A::Error,
    ) {
        let message = err.to_string();
        tracing::error!(actor = %handle, error = %message, "actor crashed");
        if let Some(sink) = monitor {
            sink.emit(*handle.id(), ActorEventKind::Crashed { error: message.clone() })
                .await;
        }
        behavior
            .terminate(&TerminationReason::Crashed(message), ctx)
            .await;
        alive.store(false, Ordering::Release);
    }
}

impl<A: PersistentActor> ActorEngine<A> {
    /// Like [`ActorEngine::start`], but first loads any snapshot saved under
    /// `behavior.persistence_key()` and restores it before `init` runs, then
    /// checkpoints state after every successfully handled message per
    /// `persistence.policy` (§4.10 "Actor integration").
    pub async fn start_persistent(
        mut behavior: A,
        options: StartOptions,
        config: EngineConfig,
        monitor: Option<Arc<dyn LifecycleSink>>,
        persistence: PersistenceConfig,
    ) -> Result<Self, EngineError> {
        let key = behavior.persistence_key();
        match persistence.store.load(&key).await {
            Ok(Some(snapshot)) => {
                let found_version = snapshot.schema_version;
                behavior.restore_state(snapshot).map_err(|err| {
                    EngineError::StateRestoreIncompatible(format!(
                        "key {key} (schema {found_version}): {err}"
                    ))
                })?;
            }
            Ok(None) => {}
            Err(err) => return Err(EngineError::SnapshotStoreFailed(err.to_string())),
        }

        let handle = match &options.name {
            Some(name) => ActorAddress::named(name.clone()),
            None => ActorAddress::anonymous(),
        };
        let ctx = ActorContext::new(handle.clone());

        if let Err(err) = behavior.init(&ctx).await {
            if let Some(sink) = &monitor {
                sink.emit(
                    *handle.id(),
                    ActorEventKind::Crashed {
                        error: err.to_string(),
                    },
                )
                .await;
            }
            return Err(EngineError::InitializationFailed(err.to_string()));
        }

        if let Some(sink) = &monitor {
            sink.emit(*handle.id(), ActorEventKind::Started).await;
        }

        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let alive = Arc::new(AtomicBool::new(true));

        let worker_handle = handle.clone();
        let worker_alive = Arc::clone(&alive);
        let join = tokio::spawn(Self::run_worker_persistent(
            behavior,
            ctx,
            rx,
            worker_alive,
            worker_handle,
            monitor,
            persistence,
            key,
        ));
        let abort = join.abort_handle();

        Ok(Self {
            handle,
            tx,
            alive,
            abort,
            config,
        })
    }

    /// Force a checkpoint outside the configured policy's cadence. Enqueued
    /// like any other mailbox item, so it runs after everything already
    /// queued ahead of it rather than racing the worker.
    pub async fn checkpoint(&self) -> Result<(), EngineError> {
        if !self.is_alive() {
            return Err(EngineError::ServerNotRunning);
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(MailboxItem::Checkpoint { ack: ack_tx }).await.is_err() {
            return Err(EngineError::ServerNotRunning);
        }
        ack_rx.await.map_err(|_recv_dropped| EngineError::ServerCrashed)?
    }

    async fn run_worker_persistent(
        mut behavior: A,
        ctx: ActorContext,
        mut rx: mpsc::Receiver<MailboxItem<A>>,
        alive: Arc<AtomicBool>,
        handle: ActorHandle,
        monitor: Option<Arc<dyn LifecycleSink>>,
        persistence: PersistenceConfig,
        key: String,
    ) {
        let mut since_checkpoint: u32 = 0;
        while let Some(item) = rx.recv().await {
            match item {
                MailboxItem::Call { msg, reply_tx, .. } => match behavior.handle_call(msg, &ctx).await {
                    Ok(reply) => {
                        let _ = reply_tx.send(Ok(reply));
                        Self::maybe_checkpoint(&behavior, &persistence, &key, &mut since_checkpoint).await;
                    }
                    Err(err) => {
                        let _ = reply_tx.send(Err(EngineError::ServerCrashed));
                        Self::crash(&mut behavior, &ctx, &alive, &handle, &monitor, err).await;
                        return;
                    }
                },
                MailboxItem::Cast { msg } => {
                    if let Err(err) = behavior.handle_cast(msg, &ctx).await {
                        Self::crash(&mut behavior, &ctx, &alive, &handle, &monitor, err).await;
                        return;
                    }
                    Self::maybe_checkpoint(&behavior, &persistence, &key, &mut since_checkpoint).await;
                }
                MailboxItem::Checkpoint { ack } => {
                    let result = Self::save_checkpoint(&behavior, &persistence, &key).await;
                    since_checkpoint = 0;
                    let _ = ack.send(result);
                }
                MailboxItem::Stop { reason, ack } => {
                    behavior.terminate(&reason, &ctx).await;
                    alive.store(false, Ordering::Release);
                    if let Some(sink) = &monitor {
                        sink.emit(
                            *handle.id(),
                            ActorEventKind::Terminated {
                                reason: reason.to_string(),
                            },
                        )
                        .await;
                    }
                    let _ = ack.send(());
                    return;
                }
            }
        }
        if alive.swap(false, Ordering::AcqRel) {
            behavior.terminate(&TerminationReason::Normal, &ctx).await;
            if let Some(sink) = &monitor {
                sink.emit(*handle.id(), ActorEventKind::Terminated { reason: "normal".into() })
                    .await;
            }
        }
    }

    async fn maybe_checkpoint(
        behavior: &A,
        persistence: &PersistenceConfig,
        key: &str,
        since_checkpoint: &mut u32,
    ) {
        let due = match persistence.policy {
            CheckpointPolicy::EachMessage => true,
            CheckpointPolicy::EveryN(n) => {
                *since_checkpoint += 1;
                *since_checkpoint >= n.max(1)
            }
            CheckpointPolicy::Manual => false,
        };
        if due && Self::save_checkpoint(behavior, persistence, key).await.is_ok() {
            *since_checkpoint = 0;
        }
    }

    async fn save_checkpoint(
        behavior: &A,
        persistence: &PersistenceConfig,
        key: &str,
    ) -> Result<(), EngineError> {
        let snapshot = Snapshot::new(behavior.snapshot_state(), behavior.schema_version());
        persistence.store.save(key, snapshot).await.map_err(|err| {
            tracing::warn!(actor_key = %key, error = %err, "checkpoint failed");
            EngineError::SnapshotStoreFailed(err.to_string())
        })
    }
}
