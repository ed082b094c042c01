//! Distributed supervisor (§4.8): places children across connected nodes
//! by [`NodeSelector`], fails them over on `nodeDown`, and reuses
//! `wardenrt::supervisor`'s restart-intensity window for the supervisor as
//! a whole, exactly as the local `Supervisor` uses one window across all
//! its children rather than one per child.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use wardenrt::engine::{FanOutSink, LifecycleSink};
use wardenrt::monitoring::ActorEventKind;
use wardenrt::supervisor::{ChildId, RestartIntensity, RestartPolicy};
use wardenrt::util::{ActorAddress, ActorId, NodeId};

use crate::error::DistributedSupervisorError;
use crate::membership::MembershipTable;
use crate::remote::{ActorDirectory, BehaviorRegistry, RemoteRouter};

use super::selector::{NodeSelector, SelectionContext};

/// `{id, behaviorName, args?, restart, nodeSelector?, shutdownTimeoutMs?, significant?}` (§4.8).
#[derive(Clone)]
pub struct DistributedChildSpec {
    pub id: ChildId,
    pub behavior_name: String,
    pub args: Vec<u8>,
    pub restart: RestartPolicy,
    pub selector: NodeSelector,
    pub shutdown_timeout: Duration,
    pub significant: bool,
}

impl DistributedChildSpec {
    pub fn new(id: impl Into<String>, behavior_name: impl Into<String>, args: Vec<u8>, restart: RestartPolicy) -> Self {
        Self {
            id: ChildId::new(id),
            behavior_name: behavior_name.into(),
            args,
            restart,
            selector: NodeSelector::LocalFirst,
            shutdown_timeout: Duration::from_millis(5000),
            significant: false,
        }
    }

    pub fn with_selector(mut self, selector: NodeSelector) -> Self {
        self.selector = selector;
        self
    }
}

/// Where a distributed child currently lives, or that it is waiting for a
/// node to become available (§4.8 "Failover": "child enters a *waiting* state").
#[derive(Clone)]
enum Placement {
    Placed { node: NodeId, handle: ActorAddress },
    Waiting,
}

struct ChildState {
    spec: DistributedChildSpec,
    placement: Placement,
}

struct DistributedSupervisorInner {
    supervisor_id: String,
    local_node: NodeId,
    router: Arc<RemoteRouter>,
    behaviors: Arc<BehaviorRegistry>,
    directory: Arc<ActorDirectory>,
    membership: Arc<MembershipTable>,
    /// Cluster-wide lifecycle observer (directory cleanup, remote-monitor
    /// notify, global-registry cleanup) composed alongside each locally
    /// placed child's restart-decision sink, so a distributed child gets the
    /// same cleanup a directly-spawned remote actor would.
    local_sink: Arc<dyn LifecycleSink>,
    children: RwLock<Vec<ChildState>>,
    lookup: DashMap<ActorId, ChildId>,
    intensity: Mutex<RestartIntensity>,
    decision_lock: Mutex<()>,
    stopped: AtomicBool,
}

/// A running distributed supervisor. Cheap to clone; every clone shares the
/// same child list and restart-intensity state.
#[derive(Clone)]
pub struct DistributedSupervisor {
    inner: Arc<DistributedSupervisorInner>,
}

impl DistributedSupervisor {
    /// Start a distributed supervisor: every child is placed in list order
    /// using its selector (or the supervisor falls back to `Waiting` if no
    /// node qualifies, rather than failing the whole start — unlike the
    /// local `Supervisor`, a placement gap is an expected steady state here).
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        supervisor_id: impl Into<String>,
        children: Vec<DistributedChildSpec>,
        max_restarts: u32,
        within: Duration,
        local_node: NodeId,
        router: Arc<RemoteRouter>,
        behaviors: Arc<BehaviorRegistry>,
        directory: Arc<ActorDirectory>,
        membership: Arc<MembershipTable>,
        local_sink: Arc<dyn LifecycleSink>,
    ) -> Result<Self, DistributedSupervisorError> {
        let mut ids = std::collections::HashSet::new();
        for spec in &children {
            if !ids.insert(spec.id.clone()) {
                return Err(DistributedSupervisorError::DuplicateChild(spec.id.to_string()));
            }
        }

        let inner = Arc::new(DistributedSupervisorInner {
            supervisor_id: supervisor_id.into(),
            local_node,
            router,
            behaviors,
            directory,
            membership,
            local_sink,
            children: RwLock::new(
                children.into_iter().map(|spec| ChildState { spec, placement: Placement::Waiting }).collect(),
            ),
            lookup: DashMap::new(),
            intensity: Mutex::new(RestartIntensity::new(max_restarts, within)),
            decision_lock: Mutex::new(()),
            stopped: AtomicBool::new(false),
        });
        let supervisor = Self { inner };

        let specs: Vec<DistributedChildSpec> =
            supervisor.inner.children.read().await.iter().map(|c| c.spec.clone()).collect();
        for (idx, spec) in specs.into_iter().enumerate() {
            let placement = supervisor.place_and_spawn(&spec, &[]).await?;
            supervisor.inner.children.write().await[idx].placement = placement;
        }
        Ok(supervisor)
    }

    /// Current `{childId -> (nodeId, handle)}` for every placed child, and
    /// `None` for any still `waiting`.
    pub async fn placements(&self) -> Vec<(ChildId, Option<(NodeId, ActorAddress)>)> {
        self.inner
            .children
            .read()
            .await
            .iter()
            .map(|c| {
                let placed = match &c.placement {
                    Placement::Placed { node, handle } => Some((node.clone(), handle.clone())),
                    Placement::Waiting => None,
                };
                (c.spec.id.clone(), placed)
            })
            .collect()
    }

    async fn place_and_spawn(
        &self,
        spec: &DistributedChildSpec,
        exclude: &[NodeId],
    ) -> Result<Placement, DistributedSupervisorError> {
        let mut candidates = self.inner.membership.connected_nodes();
        candidates.push(self.inner.local_node.clone());
        candidates.retain(|n| !exclude.contains(n));

        let chosen = {
            let children = self.inner.children.read().await;
            let load = |node: &NodeId| {
                children
                    .iter()
                    .filter(|c| matches!(&c.placement, Placement::Placed { node: n, .. } if n == node))
                    .count()
            };
            let ctx = SelectionContext { candidates: &candidates, local_node: &self.inner.local_node, load: &load };
            spec.selector.select(&ctx)
        };

        let Some(node) = chosen else {
            tracing::warn!(child = %spec.id, "no node available to place child, entering waiting state");
            return Ok(Placement::Waiting);
        };

        let handle = self.spawn_on(&node, spec).await?;
        Ok(Placement::Placed { node, handle })
    }

    async fn spawn_on(&self, node: &NodeId, spec: &DistributedChildSpec) -> Result<ActorAddress, DistributedSupervisorError> {
        if node == &self.inner.local_node {
            let sink: Arc<dyn LifecycleSink> = FanOutSink::new(vec![
                Arc::new(LocalChildSink { supervisor: self.clone(), child_id: spec.id.clone() }),
                Arc::clone(&self.inner.local_sink),
            ]);
            let actor = self
                .inner
                .behaviors
                .spawn(&spec.behavior_name, spec.args.clone(), Some(sink))
                .await
                .map_err(DistributedSupervisorError::from)?;
            let handle = actor.handle().clone().with_node(self.inner.local_node.clone());
            self.inner.lookup.insert(*handle.id(), spec.id.clone());
            self.inner.directory.insert(actor);
            Ok(handle)
        } else {
            let handle = self
                .inner
                .router
                .spawn(node, spec.behavior_name.clone(), spec.args.clone(), None)
                .await?;
            let rx = self.inner.router.monitor(&handle).await?;
            let supervisor = self.clone();
            let child_id = spec.id.clone();
            tokio::spawn(async move {
                if let Ok(reason) = rx.await {
                    // `node_down` is handled in bulk by `handle_node_down`;
                    // skip here to avoid a double re-place.
                    if reason != "node_down" {
                        supervisor.handle_child_terminated(child_id, reason, &[]).await;
                    }
                }
            });
            Ok(handle)
        }
    }

    async fn handle_child_terminated(&self, child_id: ChildId, reason: String, exclude: &[NodeId]) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.inner.decision_lock.lock().await;
        let abnormal = reason != "normal";

        let (idx, spec) = {
            let mut children = self.inner.children.write().await;
            let Some(idx) = children.iter().position(|c| c.spec.id == child_id) else {
                return;
            };
            children[idx].placement = Placement::Waiting;
            (idx, children[idx].spec.clone())
        };

        if !spec.restart.should_restart(abnormal) {
            tracing::info!(child = %child_id, %reason, "distributed child not restarted");
            return;
        }

        let restart_result = {
            let mut intensity = self.inner.intensity.lock().await;
            intensity.record(Utc::now())
        };
        match restart_result {
            Ok(attempt) => match self.place_and_spawn(&spec, exclude).await {
                Ok(placement) => {
                    self.inner.children.write().await[idx].placement = placement;
                    tracing::warn!(child = %child_id, attempt, %reason, "distributed child restarted");
                }
                Err(err) => {
                    tracing::error!(child = %child_id, error = %err, "failed to re-place distributed child");
                }
            },
            Err(err) => {
                tracing::error!(supervisor = %self.inner.supervisor_id, error = %err, "restart intensity exceeded");
                self.fail().await;
            }
        }
    }

    /// Failover (§4.8): enumerate children placed on `node`, treat each as
    /// crashed with reason `node-down`, and re-place excluding `node`.
    pub async fn handle_node_down(&self, node: &NodeId) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let affected: Vec<ChildId> = {
            let children = self.inner.children.read().await;
            children
                .iter()
                .filter_map(|c| match &c.placement {
                    Placement::Placed { node: n, .. } if n == node => Some(c.spec.id.clone()),
                    _ => None,
                })
                .collect()
        };
        for child_id in affected {
            self.handle_child_terminated(child_id, "node-down".to_string(), std::slice::from_ref(node)).await;
        }
    }

    /// Retry placement for every `waiting` child once a new node joins
    /// (§4.8: "retried when any new node joins").
    pub async fn handle_node_up(&self, _node: &NodeId) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let waiting: Vec<(usize, DistributedChildSpec)> = {
            let children = self.inner.children.read().await;
            children
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c.placement, Placement::Waiting))
                .map(|(i, c)| (i, c.spec.clone()))
                .collect()
        };
        for (idx, spec) in waiting {
            if let Ok(placement) = self.place_and_spawn(&spec, &[]).await {
                if !matches!(placement, Placement::Waiting) {
                    self.inner.children.write().await[idx].placement = placement;
                }
            }
        }
    }

    async fn fail(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        tracing::error!(supervisor = %self.inner.supervisor_id, "distributed supervisor restart intensity exceeded, stopping");
        let children = self.inner.children.read().await;
        for child in children.iter() {
            if let Placement::Placed { node, handle } = &child.placement {
                if node == &self.inner.local_node {
                    if let Some(actor) = self.inner.directory.get(handle.id()) {
                        let _ = actor.dyn_stop("supervisor_shutdown".to_string(), child.spec.shutdown_timeout).await;
                    }
                }
            }
        }
    }
}

/// Adapts [`DistributedSupervisor`] into a [`LifecycleSink`] so locally
/// placed children route termination straight back into the restart
/// decision, the same shape `wardenrt::supervisor::Supervisor` uses for
/// itself via `lookup`.
struct LocalChildSink {
    supervisor: DistributedSupervisor,
    child_id: ChildId,
}

#[async_trait]
impl LifecycleSink for LocalChildSink {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        let reason = match kind {
            ActorEventKind::Terminated { reason } => reason,
            ActorEventKind::Crashed { error } => error,
            _ => return,
        };
        self.supervisor.inner.lookup.remove(&actor_id);
        self.supervisor.handle_child_terminated(self.child_id.clone(), reason, &[]).await;
    }
}
