//! [`RemoteRouter`]: the node-local hub for remote call/cast/spawn/monitor
//! traffic (§4.6).
//!
//! `crate::cluster::Cluster` owns one `RemoteRouter` and feeds it every
//! decoded [`crate::wire::Inbound`] frame; the router answers the
//! corresponding outbound half (a `CallReply`, a `SpawnReply`, a
//! `MonitorNotify`) by looking up the already-established
//! [`ConnectionHandle`] for the peer. This mirrors how
//! `wardenrt::supervisor::Supervisor` centralizes restart decisions rather
//! than spreading them across each child.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use wardenrt::engine::LifecycleSink;
use wardenrt::monitoring::ActorEventKind;
use wardenrt::util::{ActorAddress, ActorId, NodeId};

use crate::error::RemoteError;
use crate::transport::ConnectionHandle;
use crate::wire::message::{CallErrorKind, SpawnOutcome};
use crate::wire::WireMessage;

use super::behavior_registry::BehaviorRegistry;
use super::directory::ActorDirectory;
use super::monitor::{LocalWatchers, PendingMonitors};

enum CallOutcome {
    Ok(Vec<u8>),
    Err(CallErrorKind, String),
    /// The target node was declared down while this call was in flight
    /// (§4.6: "all pending calls to that node fail with node-unreachable").
    NodeDown(NodeId),
}

/// Node-local hub wiring the directory, behavior registry, and pending
/// call/spawn/monitor tables to the outbound connection table.
pub struct RemoteRouter {
    local_node: NodeId,
    connections: Arc<DashMap<NodeId, ConnectionHandle>>,
    directory: Arc<ActorDirectory>,
    behaviors: Arc<BehaviorRegistry>,
    pending_calls: DashMap<Uuid, (NodeId, oneshot::Sender<CallOutcome>)>,
    pending_spawns: DashMap<Uuid, (NodeId, oneshot::Sender<Result<ActorAddress, RemoteError>>)>,
    local_watchers: LocalWatchers,
    pending_monitors: PendingMonitors,
    /// Which node hosts each target this node currently monitors, so a
    /// connection drop can resolve the matching waiters locally instead of
    /// waiting for a `MonitorNotify` that will never arrive.
    monitored_targets: DashMap<NodeId, Vec<ActorId>>,
    default_call_timeout: Duration,
}

impl RemoteRouter {
    pub fn new(
        local_node: NodeId,
        connections: Arc<DashMap<NodeId, ConnectionHandle>>,
        directory: Arc<ActorDirectory>,
        behaviors: Arc<BehaviorRegistry>,
        default_call_timeout: Duration,
    ) -> Self {
        Self {
            local_node,
            connections,
            directory,
            behaviors,
            pending_calls: DashMap::new(),
            pending_spawns: DashMap::new(),
            local_watchers: LocalWatchers::new(),
            pending_monitors: PendingMonitors::new(),
            monitored_targets: DashMap::new(),
            default_call_timeout,
        }
    }

    fn connection_for(&self, node: &NodeId) -> Result<ConnectionHandle, RemoteError> {
        self.connections
            .get(node)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RemoteError::NodeNotReachable(node.clone()))
    }

    /// Remote `call(handle, msg, timeout)` (§4.6): sends a `Call` frame and
    /// awaits the correlated reply, honoring `timeout` the same way
    /// `wardenrt::engine::ActorEngine::call` does for local calls.
    pub async fn call(
        &self,
        target: &ActorAddress,
        msg: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, RemoteError> {
        let node = target.node_id().ok_or_else(|| RemoteError::Unknown("call target has no node".into()))?;
        let conn = self.connection_for(node)?;
        let timeout = timeout.unwrap_or(self.default_call_timeout);
        let call_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending_calls.insert(call_id, (node.clone(), tx));

        conn.send(WireMessage::Call {
            call_id,
            target_handle: target.clone(),
            msg,
            timeout_ms: timeout.as_millis() as u64,
            sent_at_ms: Utc::now().timestamp_millis(),
        })?;

        let outcome = tokio::time::timeout(timeout, rx).await;
        self.pending_calls.remove(&call_id);
        match outcome {
            Ok(Ok(CallOutcome::Ok(bytes))) => Ok(bytes),
            Ok(Ok(CallOutcome::Err(CallErrorKind::ServerNotRunning, _))) => Err(RemoteError::ServerNotRunning),
            Ok(Ok(CallOutcome::Err(CallErrorKind::CallTimeout, _))) => Err(RemoteError::CallTimeout),
            Ok(Ok(CallOutcome::Err(CallErrorKind::Unknown, message))) => Err(RemoteError::Unknown(message)),
            Ok(Ok(CallOutcome::NodeDown(node))) => Err(RemoteError::NodeNotReachable(node)),
            Ok(Err(_recv_dropped)) => Err(RemoteError::ServerCrashed),
            Err(_elapsed) => Err(RemoteError::CallTimeout),
        }
    }

    /// Remote `cast(handle, msg)` (§4.6): fire-and-forget, no reply expected.
    pub fn cast(&self, target: &ActorAddress, msg: Vec<u8>) -> Result<(), RemoteError> {
        let node = target.node_id().ok_or_else(|| RemoteError::Unknown("cast target has no node".into()))?;
        let conn = self.connection_for(node)?;
        conn.send(WireMessage::Cast { target_handle: target.clone(), msg })?;
        Ok(())
    }

    /// Remote `spawn(node, behaviorName, args, name)` (§4.6): asks `node` to
    /// construct and start an actor, returning its address once the
    /// `SpawnReply` arrives.
    pub async fn spawn(
        &self,
        node: &NodeId,
        behavior_name: impl Into<String>,
        args: Vec<u8>,
        name: Option<String>,
    ) -> Result<ActorAddress, RemoteError> {
        let conn = self.connection_for(node)?;
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending_spawns.insert(request_id, (node.clone(), tx));

        conn.send(WireMessage::SpawnRequest {
            request_id,
            behavior_name: behavior_name.into(),
            args,
            registration: None,
            name,
        })?;

        let outcome = tokio::time::timeout(self.default_call_timeout, rx).await;
        self.pending_spawns.remove(&request_id);
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_recv_dropped)) => Err(RemoteError::Unknown("spawn reply channel dropped".into())),
            Err(_elapsed) => Err(RemoteError::CallTimeout),
        }
    }

    /// Subscribe to `target`'s termination (§4.6 "monitor"). Fires once,
    /// with the termination reason, whether the target actor terminates
    /// normally/abnormally or its node goes down.
    pub async fn monitor(&self, target: &ActorAddress) -> Result<oneshot::Receiver<String>, RemoteError> {
        let node = target.node_id().ok_or_else(|| RemoteError::Unknown("monitor target has no node".into()))?;
        let conn = self.connection_for(node)?;
        let rx = self.pending_monitors.register(*target.id());
        self.monitored_targets.entry(node.clone()).or_default().push(*target.id());
        conn.send(WireMessage::MonitorSubscribe { handle: target.clone(), subscriber: self.local_node.clone() })?;
        Ok(rx)
    }

    /// Every target this node currently monitors on `node`, removed from
    /// the tracking table. Called by `crate::cluster::Cluster` when `node`
    /// is declared down, to learn which pending monitors must resolve
    /// locally instead of waiting for a `MonitorNotify` that will never
    /// arrive (§4.6, §4.5).
    pub fn take_targets_on_node(&self, node: &NodeId) -> Vec<ActorId> {
        self.monitored_targets.remove(node).map(|(_, v)| v).unwrap_or_default()
    }

    /// Resolve every outstanding local monitor waiting on actors hosted by
    /// `node`, called when that node's connection drops (§4.6, §4.5).
    pub fn resolve_monitors_for_down_node(&self, targets: &[ActorId], reason: &str) {
        self.pending_monitors.notify_node_down(targets, reason);
    }

    /// Resolve every pending `call`/`spawn` addressed at `node` when it's
    /// declared down, with `RemoteError::NodeNotReachable` rather than
    /// letting each one wait out its full timeout (§4.6: "On nodeDown for
    /// the target, all pending calls to that node fail with
    /// node-unreachable").
    pub fn fail_pending_for_node(&self, node: &NodeId) {
        let call_ids: Vec<Uuid> = self
            .pending_calls
            .iter()
            .filter(|entry| &entry.value().0 == node)
            .map(|entry| *entry.key())
            .collect();
        for call_id in call_ids {
            if let Some((_, (_, tx))) = self.pending_calls.remove(&call_id) {
                let _ = tx.send(CallOutcome::NodeDown(node.clone()));
            }
        }

        let spawn_ids: Vec<Uuid> = self
            .pending_spawns
            .iter()
            .filter(|entry| &entry.value().0 == node)
            .map(|entry| *entry.key())
            .collect();
        for request_id in spawn_ids {
            if let Some((_, (_, tx))) = self.pending_spawns.remove(&request_id) {
                let _ = tx.send(Err(RemoteError::NodeNotReachable(node.clone())));
            }
        }
    }

    /// Handle an inbound `Call`: dispatch to the local directory and send
    /// back `CallReply`/`CallError` on `reply_conn`.
    pub async fn handle_call(
        &self,
        reply_conn: &ConnectionHandle,
        call_id: Uuid,
        target_handle: ActorAddress,
        msg: Vec<u8>,
        timeout_ms: u64,
    ) {
        let Some(actor) = self.directory.get(target_handle.id()) else {
            let _ = reply_conn.send(WireMessage::CallError {
                call_id,
                kind: CallErrorKind::ServerNotRunning,
                message: "actor not found".to_string(),
            });
            return;
        };
        let timeout = Duration::from_millis(timeout_ms);
        match actor.dyn_call(msg, timeout).await {
            Ok(result) => {
                let _ = reply_conn.send(WireMessage::CallReply { call_id, result });
            }
            Err(RemoteError::CallTimeout) => {
                let _ = reply_conn.send(WireMessage::CallError {
                    call_id,
                    kind: CallErrorKind::CallTimeout,
                    message: "call timed out".to_string(),
                });
            }
            Err(RemoteError::ServerNotRunning | RemoteError::ServerCrashed) => {
                let _ = reply_conn.send(WireMessage::CallError {
                    call_id,
                    kind: CallErrorKind::ServerNotRunning,
                    message: "server not running".to_string(),
                });
            }
            Err(other) => {
                let _ = reply_conn.send(WireMessage::CallError {
                    call_id,
                    kind: CallErrorKind::Unknown,
                    message: other.to_string(),
                });
            }
        }
    }

    /// Handle an inbound `CallReply`/`CallError`: resolve the correlated waiter.
    pub fn handle_call_reply(&self, call_id: Uuid, result: Vec<u8>) {
        if let Some((_, (_, tx))) = self.pending_calls.remove(&call_id) {
            let _ = tx.send(CallOutcome::Ok(result));
        }
    }

    pub fn handle_call_error(&self, call_id: Uuid, kind: CallErrorKind, message: String) {
        if let Some((_, (_, tx))) = self.pending_calls.remove(&call_id) {
            let _ = tx.send(CallOutcome::Err(kind, message));
        }
    }

    /// Handle an inbound `Cast`: best-effort, dropped silently if the
    /// target doesn't exist (mirrors local `cast` semantics).
    pub fn handle_cast(&self, target_handle: ActorAddress, msg: Vec<u8>) {
        if let Some(actor) = self.directory.get(target_handle.id()) {
            if let Err(err) = actor.dyn_cast(msg) {
                tracing::trace!(target = %target_handle, error = %err, "remote cast dropped");
            }
        } else {
            tracing::trace!(target = %target_handle, "remote cast dropped: actor not found");
        }
    }

    /// Handle an inbound `SpawnRequest`: spawn locally via the behavior
    /// registry and reply with the new address or an error.
    pub async fn handle_spawn_request(
        &self,
        reply_conn: &ConnectionHandle,
        request_id: Uuid,
        behavior_name: String,
        args: Vec<u8>,
        sink: Option<Arc<dyn LifecycleSink>>,
    ) {
        let outcome = match self.behaviors.spawn(&behavior_name, args, sink).await {
            Ok(actor) => {
                let handle = actor.handle().clone().with_node(self.local_node.clone());
                self.directory.insert(actor);
                SpawnOutcome::Ok(handle)
            }
            Err(err) => SpawnOutcome::Err { kind: "spawn_failed".to_string(), message: err.to_string() },
        };
        let _ = reply_conn.send(WireMessage::SpawnReply { request_id, outcome });
    }

    pub fn handle_spawn_reply(&self, request_id: Uuid, outcome: SpawnOutcome) {
        if let Some((_, (_, tx))) = self.pending_spawns.remove(&request_id) {
            let result = match outcome {
                SpawnOutcome::Ok(addr) => Ok(addr),
                SpawnOutcome::Err { message, .. } => Err(RemoteError::SpawnFailed(message)),
            };
            let _ = tx.send(result);
        }
    }

    /// Handle an inbound `MonitorSubscribe`: record the watcher so a later
    /// local termination notifies it.
    pub fn handle_monitor_subscribe(&self, handle: ActorAddress, subscriber: NodeId) {
        self.local_watchers.add(*handle.id(), subscriber);
    }

    /// Handle an inbound `MonitorNotify`: resolve the local waiter.
    pub fn handle_monitor_notify(&self, handle: ActorAddress, reason: String) {
        self.pending_monitors.notify(handle.id(), reason);
    }

    /// Called by the directory's lifecycle sink when a locally-hosted actor
    /// terminates: notify every remote node watching it.
    pub fn notify_local_termination(&self, actor_id: ActorId, reason: &str) {
        for subscriber in self.local_watchers.drain(&actor_id) {
            if let Ok(conn) = self.connection_for(&subscriber) {
                let handle = ActorAddress::Anonymous { id: actor_id, node_id: Some(self.local_node.clone()) };
                let _ = conn.send(WireMessage::MonitorNotify { handle, reason: reason.to_string() });
            }
        }
    }
}

/// Adapts [`RemoteRouter`] into a [`LifecycleSink`] so it observes every
/// locally-hosted actor's termination the same way
/// [`super::directory::ActorDirectory`] does, in order to drive remote
/// monitor notifications.
#[async_trait::async_trait]
impl LifecycleSink for RemoteRouter {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        match kind {
            ActorEventKind::Terminated { reason } => self.notify_local_termination(actor_id, &reason),
            ActorEventKind::Crashed { error } => self.notify_local_termination(actor_id, &error),
            _ => {}
        }
    }
}
