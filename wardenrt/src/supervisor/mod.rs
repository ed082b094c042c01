//! Hierarchical supervision (§4.2).
//!
//! A [`Supervisor`] holds an ordered list of [`ChildSpec`]s, starts them in
//! order, and subscribes to their lifecycle events the same way
//! [`crate::registry::Registry`] does: each child's `ActorEngine::start` is
//! given `supervisor.lifecycle_sink()` as its monitor, so a crash or
//! termination routes straight back into the owning supervisor's restart
//! decision instead of through a polling loop.
//!
//! A supervisor is itself a [`child::Child`] (via [`SupervisorChild`]), so
//! supervisors nest: a parent supervisor's `max-restarts-exceeded` failure
//! propagates to *its* supervisor exactly as §4.2 specifies.

pub mod child;
pub mod error;
pub mod types;

pub use child::{ActorChild, Child};
pub use error::SupervisorError;
pub use types::{
    AutoShutdown, ChildFactory, ChildFuture, ChildId, ChildSpec, RestartIntensity, RestartPolicy,
    SupervisionStrategy,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use crate::actor::TerminationReason;
use crate::engine::LifecycleSink;
use crate::monitoring::ActorEventKind;
use crate::util::ActorId;

struct ChildEntry {
    spec: ChildSpec,
    child: Option<Box<dyn Child>>,
    significant_terminated: bool,
}

struct SupervisorInner {
    supervisor_id: ActorId,
    strategy: SupervisionStrategy,
    auto_shutdown: AutoShutdown,
    children: RwLock<Vec<ChildEntry>>,
    intensity: Mutex<RestartIntensity>,
    lookup: DashMap<ActorId, ChildId>,
    decision_lock: Mutex<()>,
    stopped: AtomicBool,
    parent_sink: RwLock<Option<Arc<dyn LifecycleSink>>>,
    /// External lifecycle observers (§4.1: "crashed"/"restarted" are
    /// broadcast to registered observers), distinct from `parent_sink`,
    /// which only carries *this* supervisor's own `max-restarts-exceeded`
    /// failure up to its own supervisor.
    observers: RwLock<Vec<Arc<dyn LifecycleSink>>>,
}

/// Parameters for [`Supervisor::start`] (§4.2 "Start contract").
pub struct SupervisorStart {
    pub strategy: SupervisionStrategy,
    pub children: Vec<ChildSpec>,
    pub max_restarts: u32,
    pub within: Duration,
    pub auto_shutdown: AutoShutdown,
}

impl Default for SupervisorStart {
    fn default() -> Self {
        Self {
            strategy: SupervisionStrategy::OneForOne,
            children: Vec::new(),
            max_restarts: 3,
            within: Duration::from_millis(5000),
            auto_shutdown: AutoShutdown::Never,
        }
    }
}

/// A running supervisor. Cheap to clone (an `Arc` clone); every clone
/// refers to the same child list and restart-intensity state.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

impl Supervisor {
    /// Start a supervisor: children are started in list order; any failed
    /// start aborts the supervisor start and terminates the already-started
    /// children in reverse order (§4.2 "Start contract").
    pub async fn start(start: SupervisorStart) -> Result<Self, SupervisorError> {
        let inner = Arc::new(SupervisorInner {
            supervisor_id: ActorId::new(),
            strategy: start.strategy,
            auto_shutdown: start.auto_shutdown,
            children: RwLock::new(Vec::new()),
            intensity: Mutex::new(RestartIntensity::new(start.max_restarts, start.within)),
            lookup: DashMap::new(),
            decision_lock: Mutex::new(()),
            stopped: AtomicBool::new(false),
            parent_sink: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
        });
        let supervisor = Self { inner };
        let sink = supervisor.lifecycle_sink();

        let mut started = Vec::with_capacity(start.children.len());
        for spec in start.children {
            match (spec.factory)(sink.clone()).await {
                Ok(child) => {
                    supervisor.inner.lookup.insert(child.actor_id(), spec.id.clone());
                    started.push(ChildEntry {
                        spec,
                        child: Some(child),
                        significant_terminated: false,
                    });
                }
                Err(err) => {
                    for entry in started.into_iter().rev() {
                        if let Some(child) = entry.child {
                            let _ = child.stop(TerminationReason::Shutdown, entry.spec.shutdown_timeout).await;
                        }
                    }
                    return Err(err);
                }
            }
        }
        *supervisor.inner.children.write().await = started;
        tracing::info!(strategy = ?supervisor.inner.strategy, "supervisor started");
        Ok(supervisor)
    }

    /// This supervisor's identity for lifecycle correlation when nested
    /// under another supervisor via [`SupervisorChild`].
    pub fn id(&self) -> ActorId {
        self.inner.supervisor_id
    }

    /// The [`LifecycleSink`] to hand to children's `ActorEngine::start` (or
    /// registry/monitor fan-outs alongside it) so their termination events
    /// reach this supervisor's restart logic.
    pub fn lifecycle_sink(&self) -> Arc<dyn LifecycleSink> {
        Arc::new(self.clone())
    }

    /// Wire this supervisor's own failures (restart intensity exceeded) up
    /// to a parent's sink. Called by [`SupervisorChild`]'s factory wrapper
    /// when this supervisor is started as another supervisor's child.
    pub async fn set_parent_sink(&self, sink: Arc<dyn LifecycleSink>) {
        *self.inner.parent_sink.write().await = Some(sink);
    }

    /// Register an external lifecycle observer: `sink.emit` is called with
    /// `Crashed`/`Terminated` (forwarded as each child reports it) and
    /// `Restarted{attempt}` (emitted by this supervisor once a restart
    /// completes), per §4.1's lifecycle-event list. Multiple observers may
    /// be registered; each sees every event in emission order.
    pub async fn subscribe(&self, sink: Arc<dyn LifecycleSink>) {
        self.inner.observers.write().await.push(sink);
    }

    async fn notify_observers(&self, actor_id: ActorId, kind: ActorEventKind) {
        let observers = self.inner.observers.read().await;
        for observer in observers.iter() {
            observer.emit(actor_id, kind.clone()).await;
        }
    }

    /// Number of children currently tracked (alive or awaiting restart).
    pub async fn child_count(&self) -> usize {
        self.inner.children.read().await.len()
    }

    /// Append a new child and start it immediately. Works for any strategy;
    /// `simple_one_for_one` supervisors use this as their primary way of
    /// acquiring children (§4.2 "Dynamic management").
    pub async fn start_child(&self, spec: ChildSpec) -> Result<ChildId, SupervisorError> {
        let mut children = self.inner.children.write().await;
        if children.iter().any(|e| e.spec.id == spec.id) {
            return Err(SupervisorError::DuplicateChild(spec.id));
        }
        let sink = self.lifecycle_sink();
        let child = (spec.factory)(sink)
            .await
            .map_err(|_| SupervisorError::ChildStartFailed(spec.id.clone(), "start failed".into()))?;
        self.inner.lookup.insert(child.actor_id(), spec.id.clone());
        let id = spec.id.clone();
        children.push(ChildEntry {
            spec,
            child: Some(child),
            significant_terminated: false,
        });
        Ok(id)
    }

    /// Stop and remove `id` without restarting it (§4.2 "Dynamic management").
    pub async fn terminate_child(&self, id: &ChildId) -> Result<(), SupervisorError> {
        let mut children = self.inner.children.write().await;
        let idx = children
            .iter()
            .position(|e| &e.spec.id == id)
            .ok_or_else(|| SupervisorError::ChildNotFound(id.clone()))?;
        let entry = children.remove(idx);
        if let Some(child) = entry.child {
            self.inner.lookup.remove(&child.actor_id());
            child
                .stop(TerminationReason::Shutdown, entry.spec.shutdown_timeout)
                .await?;
        }
        Ok(())
    }

    /// Force a restart of `id` regardless of its restart policy (§4.2
    /// "Dynamic management").
    pub async fn restart_child(&self, id: &ChildId) -> Result<(), SupervisorError> {
        let idx = {
            let children = self.inner.children.read().await;
            children
                .iter()
                .position(|e| &e.spec.id == id)
                .ok_or_else(|| SupervisorError::ChildNotFound(id.clone()))?
        };
        {
            let mut children = self.inner.children.write().await;
            if let Some(child) = children[idx].child.take() {
                self.inner.lookup.remove(&child.actor_id());
                let _ = child
                    .stop(TerminationReason::Shutdown, children[idx].spec.shutdown_timeout)
                    .await;
            }
        }
        self.restart_one(idx).await
    }

    /// Stop the supervisor: children are terminated in reverse of their
    /// insertion order, each given its own `shutdown_timeout`
    /// (§4.2 "Shutdown").
    pub async fn stop(&self, reason: impl Into<String> + Send) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let reason = reason.into();
        let mut children = self.inner.children.write().await;
        for entry in children.drain(..).rev() {
            if let Some(child) = entry.child {
                let _ = child
                    .stop(TerminationReason::Stopped(reason.clone()), entry.spec.shutdown_timeout)
                    .await;
            }
        }
        tracing::info!(supervisor = %self.inner.supervisor_id, "supervisor_stopped");
    }

    async fn handle_child_terminated(&self, actor_id: ActorId, reason: TerminationReason) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.inner.decision_lock.lock().await;

        let Some((_, child_id)) = self.inner.lookup.remove(&actor_id) else {
            return;
        };
        let abnormal = reason.is_abnormal();

        let (idx, spec) = {
            let mut children = self.inner.children.write().await;
            let Some(idx) = children.iter().position(|e| e.spec.id == child_id) else {
                return;
            };
            children[idx].child = None;
            (idx, children[idx].spec.clone())
        };

        if spec.restart.should_restart(abnormal) {
            let restart_result = {
                let mut intensity = self.inner.intensity.lock().await;
                intensity.record(Utc::now())
            };
            match restart_result {
                Ok(attempt) => {
                    let outcome = match self.inner.strategy {
                        SupervisionStrategy::OneForOne | SupervisionStrategy::SimpleOneForOne => {
                            self.restart_one(idx).await
                        }
                        SupervisionStrategy::OneForAll => self.restart_cascade(0).await,
                        SupervisionStrategy::RestForOne => self.restart_cascade(idx).await,
                    };
                    if outcome.is_ok() {
                        tracing::warn!(child = %child_id, attempt, "child restarted");
                        self.notify_observers(actor_id, ActorEventKind::Restarted { attempt }).await;
                    } else {
                        tracing::error!(child = %child_id, "restart attempt failed to start replacement");
                    }
                }
                Err(err @ SupervisorError::MaxRestartsExceeded { .. }) => {
                    tracing::error!(error = %err, "supervisor restart intensity exceeded");
                    self.fail().await;
                }
                Err(_) => {}
            }
        } else {
            if spec.significant {
                let mut children = self.inner.children.write().await;
                if let Some(entry) = children.iter_mut().find(|e| e.spec.id == child_id) {
                    entry.significant_terminated = true;
                }
            }
            self.check_auto_shutdown().await;
        }
    }

    async fn restart_one(&self, idx: usize) -> Result<(), SupervisorError> {
        let sink = self.lifecycle_sink();
        let spec = {
            let children = self.inner.children.read().await;
            children[idx].spec.clone()
        };
        let child = (spec.factory)(sink).await?;
        self.inner.lookup.insert(child.actor_id(), spec.id.clone());
        let mut children = self.inner.children.write().await;
        children[idx].child = Some(child);
        Ok(())
    }

    /// Terminate `children[from..]` in reverse order, then restart them in
    /// forward order (shared by `one_for_all` with `from=0` and
    /// `rest_for_one` with `from=<failed index>`).
    async fn restart_cascade(&self, from: usize) -> Result<(), SupervisorError> {
        let sink = self.lifecycle_sink();
        let specs: Vec<ChildSpec> = {
            let children = self.inner.children.read().await;
            children[from..].iter().map(|e| e.spec.clone()).collect()
        };

        {
            let mut children = self.inner.children.write().await;
            let end = children.len();
            for i in (from..end).rev() {
                if let Some(child) = children[i].child.take() {
                    self.inner.lookup.remove(&child.actor_id());
                    let _ = child
                        .stop(TerminationReason::Shutdown, children[i].spec.shutdown_timeout)
                        .await;
                }
            }
        }

        for (offset, spec) in specs.into_iter().enumerate() {
            let idx = from + offset;
            let child = (spec.factory)(sink.clone()).await?;
            self.inner.lookup.insert(child.actor_id(), spec.id.clone());
            let mut children = self.inner.children.write().await;
            children[idx].child = Some(child);
        }
        Ok(())
    }

    async fn check_auto_shutdown(&self) {
        let shutdown = match self.inner.auto_shutdown {
            AutoShutdown::Never => false,
            AutoShutdown::AnySignificant => {
                let children = self.inner.children.read().await;
                children.iter().any(|e| e.spec.significant && e.significant_terminated)
            }
            AutoShutdown::AllSignificant => {
                let children = self.inner.children.read().await;
                let significant: Vec<_> = children.iter().filter(|e| e.spec.significant).collect();
                !significant.is_empty() && significant.iter().all(|e| e.significant_terminated)
            }
        };
        if shutdown {
            self.stop("auto_shutdown").await;
        }
    }

    async fn fail(&self) {
        self.stop("max_restarts_exceeded").await;
        if let Some(sink) = self.inner.parent_sink.read().await.clone() {
            sink.emit(
                self.inner.supervisor_id,
                ActorEventKind::Crashed {
                    error: "max-restarts-exceeded".into(),
                },
            )
            .await;
        }
    }
}

#[async_trait]
impl LifecycleSink for Supervisor {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        let reason = match &kind {
            ActorEventKind::Terminated { reason } => match reason.as_str() {
                "normal" => TerminationReason::Normal,
                "shutdown" => TerminationReason::Shutdown,
                other => TerminationReason::Stopped(other.to_string()),
            },
            ActorEventKind::Crashed { error } => TerminationReason::Crashed(error.clone()),
            _ => return,
        };
        self.notify_observers(actor_id, kind).await;
        self.handle_child_terminated(actor_id, reason).await;
    }
}

/// Adapts a nested [`Supervisor`] into a [`Child`] so supervisor trees can
/// be built by making a sub-supervisor one entry in a parent's child list.
pub struct SupervisorChild(pub Supervisor);

#[async_trait]
impl Child for SupervisorChild {
    async fn stop(&self, reason: TerminationReason, _timeout: Duration) -> Result<(), SupervisorError> {
        self.0.stop(reason.to_string()).await;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.0.inner.stopped.load(Ordering::Acquire)
    }

    fn actor_id(&self) -> ActorId {
        self.0.id()
    }
}
