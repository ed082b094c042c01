//! Cluster end-to-end integration tests: real TCP connections between
//! multiple in-process nodes, covering the distributed scenarios from the
//! concrete scenario list.
//!
//! # Current Test Coverage
//!
//! 1. **Remote call timeout** (1 test)
//!    - A caller's `timeoutMs` elapses before a slow `handleCall` returns;
//!      the call fails with `CallTimeout`, the target still finishes and
//!      applies the message, and the router is left usable for later calls.
//!
//! 2. **Node down failover** (1 test)
//!    - A distributed supervisor's child placed on a node that then goes
//!      down is re-placed onto a different connected node.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use wardenrt::actor::ActorContext;
use wardenrt::supervisor::RestartPolicy;
use wardenrt::util::NodeId;
use wardenrt::{Actor, Message};
use wardenrt_cluster::supervisor::{DistributedChildSpec, NodeSelector};
use wardenrt_cluster::{BehaviorRegistry, Cluster, ClusterConfig, RemoteError};

fn node(name: &str, port: u16) -> NodeId {
    NodeId::new(name, "127.0.0.1", port)
}

// ============================================================================
// TEST GROUP 1: Remote call timeout
// ============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Nudge;

impl Message for Nudge {
    const MESSAGE_TYPE: &'static str = "nudge";
}

#[derive(Debug, thiserror::Error)]
#[error("sleeper error")]
struct SleeperError;

struct Sleeper {
    handled: Arc<AtomicU32>,
}

#[async_trait]
impl Actor for Sleeper {
    type Message = Nudge;
    type Reply = ();
    type Error = SleeperError;

    async fn handle_call(&mut self, _msg: Nudge, _ctx: &ActorContext) -> Result<(), SleeperError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_cast(&mut self, _msg: Nudge, _ctx: &ActorContext) -> Result<(), SleeperError> {
        Ok(())
    }
}

#[tokio::test]
async fn slow_remote_call_times_out_and_late_reply_is_discarded() {
    let handled = Arc::new(AtomicU32::new(0));
    let behaviors_b = Arc::new(BehaviorRegistry::new());
    {
        let handled = Arc::clone(&handled);
        behaviors_b.register_fn::<Sleeper, (), _>("sleeper", move |_: ()| Sleeper { handled: Arc::clone(&handled) });
    }

    let a_cfg = ClusterConfig::builder(node("timeout_a", 18901)).heartbeat_ms(50).build();
    let cluster_a = Cluster::start(a_cfg, Arc::new(BehaviorRegistry::new())).await.expect("start a");

    let b_cfg = ClusterConfig::builder(node("timeout_b", 18902))
        .heartbeat_ms(50)
        .seed(node("timeout_a", 18901))
        .build();
    let cluster_b = Cluster::start(b_cfg, behaviors_b).await.expect("start b");

    tokio::time::sleep(Duration::from_millis(300)).await;

    let args = serde_cbor::to_vec(&()).expect("encode args");
    let handle = cluster_a
        .spawn(&node("timeout_b", 18902), "sleeper", args, None)
        .await
        .expect("remote spawn");

    let payload = serde_cbor::to_vec(&Nudge).expect("encode msg");
    let result = cluster_a.call(&handle, payload.clone(), Some(Duration::from_millis(50))).await;
    assert!(
        matches!(result, Err(RemoteError::CallTimeout)),
        "expected CallTimeout, got {result:?}"
    );
    assert_eq!(handled.load(Ordering::SeqCst), 0, "target hasn't finished yet");

    // The slow handler keeps running after the caller gave up; its effect
    // still lands once it completes.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(handled.load(Ordering::SeqCst), 1, "target applied the message despite the caller timing out");

    // The discarded late reply must not wedge the router: a fresh call
    // with a generous timeout still completes normally.
    let ok = cluster_a.call(&handle, payload, Some(Duration::from_secs(2))).await;
    assert!(ok.is_ok(), "router must still serve calls after a timed-out one: {ok:?}");
    assert_eq!(handled.load(Ordering::SeqCst), 2);
}

// ============================================================================
// TEST GROUP 2: Node down failover
// ============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
enum WorkerMsg {
    Ping,
}

impl Message for WorkerMsg {
    const MESSAGE_TYPE: &'static str = "worker_ping";
}

#[derive(Debug, thiserror::Error)]
#[error("worker error")]
struct WorkerError;

struct Worker;

#[async_trait]
impl Actor for Worker {
    type Message = WorkerMsg;
    type Reply = ();
    type Error = WorkerError;

    async fn handle_call(&mut self, _msg: WorkerMsg, _ctx: &ActorContext) -> Result<(), WorkerError> {
        Ok(())
    }

    async fn handle_cast(&mut self, _msg: WorkerMsg, _ctx: &ActorContext) -> Result<(), WorkerError> {
        Ok(())
    }
}

#[tokio::test]
async fn distributed_supervisor_migrates_child_off_a_downed_node() {
    let node_b = node("failover_b", 18911);
    let node_c = node("failover_c", 18912);
    let node_s = node("failover_s", 18913);

    let behaviors_b = Arc::new(BehaviorRegistry::new());
    behaviors_b.register_fn::<Worker, (), _>("worker", |_: ()| Worker);
    let b_cfg = ClusterConfig::builder(node_b.clone()).heartbeat_ms(50).build();
    let cluster_b = Cluster::start(b_cfg, behaviors_b).await.expect("start b");

    let behaviors_c = Arc::new(BehaviorRegistry::new());
    behaviors_c.register_fn::<Worker, (), _>("worker", |_: ()| Worker);
    let c_cfg = ClusterConfig::builder(node_c.clone()).heartbeat_ms(50).seed(node_b.clone()).build();
    let cluster_c = Cluster::start(c_cfg, behaviors_c).await.expect("start c");

    let s_cfg = ClusterConfig::builder(node_s.clone())
        .heartbeat_ms(50)
        .seed(node_b.clone())
        .seed(node_c.clone())
        .build();
    let cluster_s = Cluster::start(s_cfg, Arc::new(BehaviorRegistry::new())).await.expect("start s");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(cluster_s.membership().is_connected(&node_b));
    assert!(cluster_s.membership().is_connected(&node_c));

    // Deterministic placement: prefer node_b, fall back to node_c once
    // node_b is excluded (by `handle_node_down`'s failover re-placement).
    let (preferred, fallback) = (node_b.clone(), node_c.clone());
    let prefer_b = NodeSelector::Custom(Arc::new(move |ctx| {
        ctx.candidates
            .iter()
            .find(|n| **n == preferred)
            .or_else(|| ctx.candidates.iter().find(|n| **n == fallback))
            .cloned()
    }));

    let args = serde_cbor::to_vec(&()).expect("encode args");
    let spec = DistributedChildSpec::new("w", "worker", args, RestartPolicy::Permanent).with_selector(prefer_b);
    let supervisor = cluster_s
        .start_distributed_supervisor("sup", vec![spec], 3, Duration::from_secs(5))
        .await
        .expect("distributed supervisor starts");

    let placements = supervisor.placements().await;
    assert_eq!(placements.len(), 1);
    let (_, placed) = &placements[0];
    let (placed_node, _) = placed.clone().expect("child placed");
    assert_eq!(placed_node, node_b, "child must start on the preferred node");

    // Bring node_b down; S should observe this through the cluster's own
    // `Goodbye`/heartbeat-timeout handling and fail the child over.
    cluster_b.stop().await.expect("stop b");

    let mut migrated = false;
    for _ in 0..100 {
        let placements = supervisor.placements().await;
        if let Some((node, _)) = placements[0].1.clone() {
            if node == node_c {
                migrated = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(migrated, "child must migrate to node_c after node_b goes down");
}
