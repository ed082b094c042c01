//! [`Cluster`]: the per-node orchestrator (§4.5) that ties membership,
//! transport, remote call/cast/spawn/monitor routing, the global registry,
//! and registered distributed supervisors into one running participant.
//!
//! Every other module in this crate is a component the cluster wires
//! together; nothing here duplicates their logic. `Cluster::start` mirrors
//! `wardenrt::engine::ActorEngine::start`'s shape: build the shared state,
//! spawn the background tasks that keep it live, hand back a cheaply
//! cloneable handle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;

use wardenrt::engine::{FanOutSink, LifecycleSink};
use wardenrt::util::{ActorAddress, NodeId};

use crate::config::ClusterConfig;
use crate::error::{ClusterError, DistributedSupervisorError, RemoteError};
use crate::membership::gossip;
use crate::membership::{MembershipTable, NodeDownReason};
use crate::registry::GlobalRegistry;
use crate::remote::{ActorDirectory, BehaviorRegistry, RemoteRouter};
use crate::supervisor::{DistributedChildSpec, DistributedSupervisor};
use crate::transport::connection::{handshake, should_initiate, spawn_pump, ConnectionHandle, Inbound, ReconnectBackoff};
use crate::transport::listener::{self, Accepted};
use crate::wire::message::MemberAdvertisement;
use crate::wire::WireMessage;

/// Shared state for one node's participation in the cluster, plus the
/// background tasks (listener accept loop, seed connectors, heartbeat/gossip
/// tick, inbound dispatch) that keep it live.
pub struct Cluster {
    config: ClusterConfig,
    connections: Arc<DashMap<NodeId, ConnectionHandle>>,
    membership: Arc<MembershipTable>,
    directory: Arc<ActorDirectory>,
    behaviors: Arc<BehaviorRegistry>,
    router: Arc<RemoteRouter>,
    global_registry: Arc<GlobalRegistry>,
    /// Fans every locally-hosted actor's termination out to the directory
    /// (remote dispatch cleanup), the router (remote monitor notify), and
    /// the global registry (cluster-wide name cleanup) — handed to every
    /// locally spawned remote/distributed actor as its lifecycle sink.
    local_sink: Arc<dyn LifecycleSink>,
    distributed: RwLock<Vec<DistributedSupervisor>>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl Cluster {
    /// Join the cluster (§4.5 "Join"): bind the listener, connect to every
    /// configured seed, and start the heartbeat/gossip/dispatch loops.
    /// `behaviors` must already hold every behavior this node can remote-spawn
    /// — "nodes do not ship code" (§4.6).
    pub async fn start(config: ClusterConfig, behaviors: Arc<BehaviorRegistry>) -> Result<Arc<Self>, ClusterError> {
        let local_node = config.node_id.clone();
        let connections: Arc<DashMap<NodeId, ConnectionHandle>> = Arc::new(DashMap::new());
        let membership = Arc::new(MembershipTable::new());
        let directory = Arc::new(ActorDirectory::new());
        let global_registry = Arc::new(GlobalRegistry::new());
        let router = Arc::new(RemoteRouter::new(
            local_node.clone(),
            Arc::clone(&connections),
            Arc::clone(&directory),
            Arc::clone(&behaviors),
            Duration::from_millis(config.heartbeat_ms),
        ));
        let local_sink: Arc<dyn LifecycleSink> = FanOutSink::new(vec![
            Arc::clone(&directory) as Arc<dyn LifecycleSink>,
            Arc::clone(&router) as Arc<dyn LifecycleSink>,
            Arc::clone(&global_registry) as Arc<dyn LifecycleSink>,
        ]);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Inbound>();
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel::<Accepted>();

        let cluster = Arc::new(Self {
            config: config.clone(),
            connections,
            membership,
            directory,
            behaviors,
            router,
            global_registry,
            local_sink,
            distributed: RwLock::new(Vec::new()),
            inbound_tx: inbound_tx.clone(),
            tasks: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        });

        let listener_task = {
            let host = local_node.host().to_string();
            let port = local_node.port();
            let local = local_node.clone();
            let secret = config.cluster_secret.clone();
            let handshake_timeout = config.handshake_timeout;
            let inbound_tx = inbound_tx.clone();
            tokio::spawn(async move {
                if let Err(err) =
                    listener::run(host, port, local, secret, handshake_timeout, inbound_tx, accepted_tx).await
                {
                    tracing::error!(error = %err, "cluster listener task exited");
                }
            })
        };

        let accept_task = {
            let cluster = Arc::clone(&cluster);
            tokio::spawn(async move { cluster.run_accept_loop(accepted_rx).await })
        };

        let dispatch_task = {
            let cluster = Arc::clone(&cluster);
            tokio::spawn(async move { cluster.run_dispatch_loop(inbound_rx).await })
        };

        let heartbeat_task = {
            let cluster = Arc::clone(&cluster);
            tokio::spawn(async move { cluster.run_heartbeat_loop().await })
        };

        {
            let mut tasks = cluster.tasks.lock().await;
            tasks.push(listener_task);
            tasks.push(accept_task);
            tasks.push(dispatch_task);
            tasks.push(heartbeat_task);
        }

        for seed in config.seeds.clone() {
            if seed == local_node {
                continue;
            }
            let cluster = Arc::clone(&cluster);
            let tx = inbound_tx.clone();
            tokio::spawn(async move { cluster.connect_and_register(seed, tx).await });
        }

        Ok(cluster)
    }

    pub fn local_node(&self) -> &NodeId {
        &self.config.node_id
    }

    pub fn router(&self) -> &Arc<RemoteRouter> {
        &self.router
    }

    pub fn directory(&self) -> &Arc<ActorDirectory> {
        &self.directory
    }

    pub fn behaviors(&self) -> &Arc<BehaviorRegistry> {
        &self.behaviors
    }

    pub fn global_registry(&self) -> &Arc<GlobalRegistry> {
        &self.global_registry
    }

    pub fn membership(&self) -> &Arc<MembershipTable> {
        &self.membership
    }

    /// The combined directory/router/global-registry lifecycle sink every
    /// locally-hosted, remotely-reachable actor should be started with.
    pub fn local_sink(&self) -> Arc<dyn LifecycleSink> {
        Arc::clone(&self.local_sink)
    }

    pub fn connected_nodes(&self) -> Vec<NodeId> {
        self.membership.connected_nodes()
    }

    /// Remote `call` (§4.6), delegated to the router.
    pub async fn call(&self, target: &ActorAddress, msg: Vec<u8>, timeout: Option<Duration>) -> Result<Vec<u8>, RemoteError> {
        self.router.call(target, msg, timeout).await
    }

    /// Remote `cast` (§4.6), delegated to the router.
    pub fn cast(&self, target: &ActorAddress, msg: Vec<u8>) -> Result<(), RemoteError> {
        self.router.cast(target, msg)
    }

    /// Remote `spawn` (§4.6), delegated to the router.
    pub async fn spawn(
        &self,
        node: &NodeId,
        behavior_name: impl Into<String>,
        args: Vec<u8>,
        name: Option<String>,
    ) -> Result<ActorAddress, RemoteError> {
        self.router.spawn(node, behavior_name, args, name).await
    }

    /// Remote `monitor` (§4.6), delegated to the router.
    pub async fn monitor(&self, target: &ActorAddress) -> Result<tokio::sync::oneshot::Receiver<String>, RemoteError> {
        self.router.monitor(target).await
    }

    /// Start a distributed supervisor (§4.8) wired to this cluster's
    /// router, directory, behavior registry, membership table, and
    /// combined lifecycle sink, and register it to receive `nodeDown`/
    /// `nodeUp` notifications.
    pub async fn start_distributed_supervisor(
        &self,
        supervisor_id: impl Into<String>,
        children: Vec<DistributedChildSpec>,
        max_restarts: u32,
        within: Duration,
    ) -> Result<DistributedSupervisor, DistributedSupervisorError> {
        let supervisor = DistributedSupervisor::start(
            supervisor_id,
            children,
            max_restarts,
            within,
            self.config.node_id.clone(),
            Arc::clone(&self.router),
            Arc::clone(&self.behaviors),
            Arc::clone(&self.directory),
            Arc::clone(&self.membership),
            self.local_sink(),
        )
        .await?;
        self.distributed.write().await.push(supervisor.clone());
        Ok(supervisor)
    }

    /// Graceful shutdown (§5 "Resource policy"): broadcast `goodbye`, give
    /// pending calls `shutdown_grace_ms` to drain, then close every
    /// connection and stop the background tasks.
    pub async fn stop(&self) -> Result<(), ClusterError> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Err(ClusterError::AlreadyStopped);
        }
        for entry in self.connections.iter() {
            let _ = entry.value().send(WireMessage::Goodbye { node_id: self.config.node_id.clone() });
        }
        tokio::time::sleep(Duration::from_millis(self.config.shutdown_grace_ms)).await;
        self.connections.clear();
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        Ok(())
    }

    async fn run_accept_loop(self: Arc<Self>, mut accepted_rx: mpsc::UnboundedReceiver<Accepted>) {
        while let Some(accepted) = accepted_rx.recv().await {
            self.register_connection(accepted.handle).await;
        }
    }

    async fn run_dispatch_loop(self: Arc<Self>, mut inbound_rx: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(inbound) = inbound_rx.recv().await {
            self.membership.touch(&inbound.from);
            let cluster = Arc::clone(&self);
            cluster.dispatch(inbound).await;
        }
    }

    async fn run_heartbeat_loop(self: Arc<Self>) {
        let mut previous: HashSet<NodeId> = HashSet::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.heartbeat_ms.max(1)));
        loop {
            ticker.tick().await;
            if self.stopped.load(Ordering::Acquire) {
                return;
            }

            for node in self.membership.connected_nodes() {
                if let Some(conn) = self.connections.get(&node) {
                    let _ = conn.send(WireMessage::Heartbeat);
                }
            }

            let timeout = chrono::Duration::milliseconds(self.config.heartbeat_ms as i64 * 3);
            for node in self.membership.stale_peers(timeout) {
                self.on_node_down(&node, NodeDownReason::HeartbeatTimeout.as_str()).await;
            }

            let delta = gossip::compute_delta(&self.membership, &previous);
            if !delta.is_empty() {
                let (add, remove) = delta.into_advertisements();
                for node in self.membership.connected_nodes() {
                    if let Some(conn) = self.connections.get(&node) {
                        let _ = conn.send(WireMessage::Gossip { add: add.clone(), remove: remove.clone() });
                    }
                }
            }
            previous = self.membership.connected_nodes().into_iter().collect();
        }
    }

    /// Dial `target` with exponential backoff until a connection is
    /// established or the cluster stops. Used for both configured seeds
    /// and peers discovered through gossip that this node is responsible
    /// for initiating (§4.4 "owned by the initiator of the pair").
    async fn connect_and_register(self: Arc<Self>, target: NodeId, inbound_tx: mpsc::UnboundedSender<Inbound>) {
        let mut backoff = ReconnectBackoff::new();
        loop {
            if self.stopped.load(Ordering::Acquire) || self.connections.contains_key(&target) {
                return;
            }
            match TcpStream::connect((target.host(), target.port())).await {
                Ok(stream) => {
                    match handshake(stream, &self.config.node_id, true, self.config.handshake_timeout).await {
                        Ok((framed, peer)) => {
                            let handle = spawn_pump(
                                framed,
                                self.config.node_id.clone(),
                                peer,
                                self.config.cluster_secret.clone(),
                                inbound_tx.clone(),
                            );
                            self.register_connection(handle).await;
                            return;
                        }
                        Err(err) => {
                            tracing::warn!(%target, error = %err, "cluster join: handshake failed, retrying");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(%target, error = %err, "cluster join: connect failed, retrying");
                }
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    /// Register a freshly handshaken connection: record it, mark the peer
    /// connected, exchange the full membership table (§4.5 "Join": "On
    /// successful handshake, exchange membership tables"), and notify any
    /// registered distributed supervisor of the new node.
    async fn register_connection(&self, handle: ConnectionHandle) {
        let peer = handle.peer.clone();
        if self.connections.contains_key(&peer) {
            // Duplicate connection for a peer we already have; drop this
            // one so its pump exits once its outbound sender is released.
            return;
        }
        let was_new = !self.membership.is_connected(&peer);
        self.connections.insert(peer.clone(), handle.clone());
        self.membership.mark_connected(peer.clone());

        let known: Vec<MemberAdvertisement> = std::iter::once(self.config.node_id.clone())
            .chain(self.membership.connected_nodes())
            .map(|node_id| MemberAdvertisement { node_id })
            .collect();
        let _ = handle.send(WireMessage::Gossip { add: known, remove: Vec::new() });

        if was_new {
            for supervisor in self.distributed.read().await.iter() {
                supervisor.handle_node_up(&peer).await;
            }
        }
    }

    /// Common cleanup for a node leaving the cluster, regardless of why
    /// (§4.5 "Down nodes emit `nodeDown{reason}`"): drop its connection,
    /// mark it disconnected, resolve monitors waiting on its actors, and
    /// let every registered distributed supervisor fail over.
    async fn on_node_down(&self, node: &NodeId, reason: &str) {
        let was_connected = self.connections.remove(node).is_some();
        let was_up = self.membership.mark_disconnected(node);
        if !was_connected && !was_up {
            return;
        }
        tracing::warn!(%node, reason, "node_down");
        let targets = self.router.take_targets_on_node(node);
        self.router.resolve_monitors_for_down_node(&targets, reason);
        self.router.fail_pending_for_node(node);
        for supervisor in self.distributed.read().await.iter() {
            supervisor.handle_node_down(node).await;
        }
    }

    async fn dispatch(self: Arc<Self>, inbound: Inbound) {
        let from = inbound.from;
        match inbound.payload {
            WireMessage::Hello { .. } => {
                tracing::trace!(%from, "unexpected Hello after handshake, ignoring");
            }
            WireMessage::Goodbye { node_id } => {
                self.on_node_down(&node_id, NodeDownReason::GracefulShutdown.as_str()).await;
            }
            WireMessage::Heartbeat => {}
            WireMessage::Gossip { add, remove } => {
                let remove_list = remove.clone();
                let discovered = gossip::apply_delta(&self.membership, add, remove, &self.config.node_id);
                for node in discovered {
                    if should_initiate(&self.config.node_id, &node) {
                        let cluster = Arc::clone(&self);
                        let tx = self.inbound_tx.clone();
                        tokio::spawn(async move { cluster.connect_and_register(node, tx).await });
                    }
                }
                for node in remove_list {
                    self.on_node_down(&node, "gossip_remove").await;
                }
            }
            WireMessage::Call { call_id, target_handle, msg, timeout_ms, .. } => {
                if let Some(conn) = self.connections.get(&from).map(|entry| entry.value().clone()) {
                    self.router.handle_call(&conn, call_id, target_handle, msg, timeout_ms).await;
                }
            }
            WireMessage::CallReply { call_id, result } => {
                self.router.handle_call_reply(call_id, result);
            }
            WireMessage::CallError { call_id, kind, message } => {
                self.router.handle_call_error(call_id, kind, message);
            }
            WireMessage::Cast { target_handle, msg } => {
                self.router.handle_cast(target_handle, msg);
            }
            WireMessage::SpawnRequest { request_id, behavior_name, args, .. } => {
                if let Some(conn) = self.connections.get(&from).map(|entry| entry.value().clone()) {
                    self.router
                        .handle_spawn_request(&conn, request_id, behavior_name, args, Some(self.local_sink()))
                        .await;
                }
            }
            WireMessage::SpawnReply { request_id, outcome } => {
                self.router.handle_spawn_reply(request_id, outcome);
            }
            WireMessage::MonitorSubscribe { handle, subscriber } => {
                self.router.handle_monitor_subscribe(handle, subscriber);
            }
            WireMessage::MonitorNotify { handle, reason } => {
                self.router.handle_monitor_notify(handle, reason);
            }
            WireMessage::GossipMetadata { .. } => {
                tracing::trace!(%from, "gossip metadata extension point not in use, ignoring");
            }
        }
    }
}
