//! Supervisor hierarchy integration tests.
//!
//! End-to-end coverage of the supervision scenarios from the concrete
//! scenario list: one_for_one restart with lifecycle-event ordering,
//! rest_for_one cascade, and restart-intensity trip.
//!
//! # Current Test Coverage
//!
//! 1. **One-for-one restart** (1 test)
//!    - Crash A out of `[A(permanent), B(permanent)]`; B untouched; event
//!      order `crashed(A)` -> `restarted(A, attempt=1)`.
//!
//! 2. **Rest-for-one cascade** (1 test)
//!    - Crash B out of `[A, B, C]`; B and C torn down in reverse then
//!      restarted forward; A never touched.
//!
//! 3. **Restart intensity** (1 test)
//!    - `maxRestarts=3, withinMs=1000`; crash a permanent child 4 times
//!      inside the window; the supervisor fails with
//!      `max-restarts-exceeded` and its own parent observes the failure.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use wardenrt::prelude::*;
use wardenrt::util::ActorId;

#[derive(Debug, Clone)]
struct Ping;

impl Message for Ping {
    const MESSAGE_TYPE: &'static str = "ping";
}

#[derive(Debug, thiserror::Error)]
#[error("worker error")]
struct WorkerError;

struct Worker {
    started: Arc<AtomicU32>,
}

#[async_trait]
impl Actor for Worker {
    type Message = Ping;
    type Reply = ();
    type Error = WorkerError;

    async fn init(&mut self, _ctx: &ActorContext) -> Result<(), WorkerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_call(&mut self, _msg: Ping, _ctx: &ActorContext) -> Result<(), WorkerError> {
        Ok(())
    }

    async fn handle_cast(&mut self, _msg: Ping, _ctx: &ActorContext) -> Result<(), WorkerError> {
        // Always errors so a `cast` is an easy way to crash the child on demand.
        Err(WorkerError)
    }
}

type WorkerHandleSlot = Arc<std::sync::Mutex<Option<ActorEngine<Worker>>>>;

/// Builds a `ChildSpec` whose most recently (re)started engine handle is
/// recorded in `slot`, so the test can `cast` straight into a specific
/// child instead of only observing the supervisor's own bookkeeping.
fn worker_spec(id: &str, restart: RestartPolicy, started: Arc<AtomicU32>, slot: WorkerHandleSlot) -> ChildSpec {
    let id_owned = id.to_string();
    ChildSpec::new(
        id,
        restart,
        Arc::new(move |sink| {
            let started = Arc::clone(&started);
            let id_owned = id_owned.clone();
            let slot = Arc::clone(&slot);
            Box::pin(async move {
                let engine = ActorEngine::start(
                    Worker { started },
                    StartOptions::new().with_name(id_owned.clone()),
                    EngineConfig::default(),
                    Some(sink),
                )
                .await
                .map_err(|e| SupervisorError::ChildStartFailed(ChildId::new(id_owned), e.to_string()))?;
                *slot.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(engine.clone());
                Ok(Box::new(ActorChild(engine)) as Box<dyn Child>)
            })
        }),
    )
}

#[derive(Default)]
struct RecordingSink {
    events: std::sync::Mutex<Vec<(ActorId, String)>>,
}

#[async_trait]
impl LifecycleSink for RecordingSink {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        let label = match kind {
            ActorEventKind::Crashed { .. } => "crashed".to_string(),
            ActorEventKind::Restarted { attempt } => format!("restarted:{attempt}"),
            ActorEventKind::Terminated { .. } => "terminated".to_string(),
            _ => return,
        };
        self.events.lock().unwrap_or_else(|poison| poison.into_inner()).push((actor_id, label));
    }
}

async fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..300 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(predicate(), "condition did not become true within 3s");
}

// ============================================================================
// TEST GROUP 1: One-for-one restart
// ============================================================================

#[tokio::test]
async fn one_for_one_crash_restarts_only_failed_child_in_order() {
    let started_a = Arc::new(AtomicU32::new(0));
    let started_b = Arc::new(AtomicU32::new(0));
    let handle_a: WorkerHandleSlot = Arc::new(std::sync::Mutex::new(None));
    let observer = Arc::new(RecordingSink::default());

    let sup = Supervisor::start(SupervisorStart {
        strategy: SupervisionStrategy::OneForOne,
        children: vec![
            worker_spec("a", RestartPolicy::Permanent, Arc::clone(&started_a), Arc::clone(&handle_a)),
            worker_spec(
                "b",
                RestartPolicy::Permanent,
                Arc::clone(&started_b),
                Arc::new(std::sync::Mutex::new(None)),
            ),
        ],
        ..Default::default()
    })
    .await
    .expect("supervisor starts");
    sup.subscribe(observer.clone() as Arc<dyn LifecycleSink>).await;

    assert_eq!(started_a.load(Ordering::SeqCst), 1);
    assert_eq!(started_b.load(Ordering::SeqCst), 1);

    let engine_a = handle_a.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("a started");
    let actor_id_a = *engine_a.handle().id();
    engine_a.cast(Ping);

    wait_until(|| started_a.load(Ordering::SeqCst) == 2).await;

    assert_eq!(started_a.load(Ordering::SeqCst), 2, "A restarted exactly once");
    assert_eq!(started_b.load(Ordering::SeqCst), 1, "B untouched by A's crash");
    assert_eq!(sup.child_count().await, 2);

    let events = observer.events.lock().unwrap_or_else(|poison| poison.into_inner()).clone();
    let crashed = events.iter().position(|(id, label)| *id == actor_id_a && label == "crashed");
    let restarted = events.iter().position(|(id, label)| *id == actor_id_a && label == "restarted:1");
    assert!(crashed.is_some(), "expected crashed(A) event: {events:?}");
    assert!(restarted.is_some(), "expected restarted(A, attempt=1) event: {events:?}");
    assert!(crashed < restarted, "crashed(A) must precede restarted(A): {events:?}");
}

// ============================================================================
// TEST GROUP 2: Rest-for-one cascade
// ============================================================================

#[tokio::test]
async fn rest_for_one_crash_cascades_to_later_siblings_only() {
    let started_a = Arc::new(AtomicU32::new(0));
    let started_b = Arc::new(AtomicU32::new(0));
    let started_c = Arc::new(AtomicU32::new(0));
    let handle_a: WorkerHandleSlot = Arc::new(std::sync::Mutex::new(None));
    let handle_b: WorkerHandleSlot = Arc::new(std::sync::Mutex::new(None));
    let handle_c: WorkerHandleSlot = Arc::new(std::sync::Mutex::new(None));

    let sup = Supervisor::start(SupervisorStart {
        strategy: SupervisionStrategy::RestForOne,
        children: vec![
            worker_spec("a", RestartPolicy::Permanent, Arc::clone(&started_a), Arc::clone(&handle_a)),
            worker_spec("b", RestartPolicy::Permanent, Arc::clone(&started_b), Arc::clone(&handle_b)),
            worker_spec("c", RestartPolicy::Permanent, Arc::clone(&started_c), Arc::clone(&handle_c)),
        ],
        ..Default::default()
    })
    .await
    .expect("supervisor starts");

    assert_eq!(started_a.load(Ordering::SeqCst), 1);
    assert_eq!(started_b.load(Ordering::SeqCst), 1);
    assert_eq!(started_c.load(Ordering::SeqCst), 1);

    let engine_a_before = handle_a.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("a started");
    let engine_b_before = handle_b.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("b started");
    let engine_c_before = handle_c.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("c started");
    let id_a_before = *engine_a_before.handle().id();
    let id_b_before = *engine_b_before.handle().id();
    let id_c_before = *engine_c_before.handle().id();

    engine_b_before.cast(Ping); // crash B -> B and C cascade, A stays up

    wait_until(|| started_b.load(Ordering::SeqCst) == 2 && started_c.load(Ordering::SeqCst) == 2).await;

    assert_eq!(started_a.load(Ordering::SeqCst), 1, "A must never be touched by B's crash");
    assert_eq!(started_b.load(Ordering::SeqCst), 2, "B restarted once");
    assert_eq!(started_c.load(Ordering::SeqCst), 2, "C restarted alongside B");
    assert_eq!(sup.child_count().await, 3);

    let engine_a_after = handle_a.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("a still running");
    let engine_b_after = handle_b.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("b restarted");
    let engine_c_after = handle_c.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("c restarted");

    assert_eq!(*engine_a_after.handle().id(), id_a_before, "A keeps its original identity");
    assert_ne!(*engine_b_after.handle().id(), id_b_before, "B is replaced by a fresh actor");
    assert_ne!(*engine_c_after.handle().id(), id_c_before, "C is replaced by a fresh actor");
    assert!(engine_a_after.is_alive());
    assert!(engine_b_after.is_alive());
    assert!(engine_c_after.is_alive());
}

// ============================================================================
// TEST GROUP 3: Restart intensity
// ============================================================================

#[tokio::test]
async fn repeated_crashes_within_window_trip_max_restarts_exceeded() {
    let started = Arc::new(AtomicU32::new(0));
    let handle: WorkerHandleSlot = Arc::new(std::sync::Mutex::new(None));
    let parent_observer = Arc::new(RecordingSink::default());

    let sup = Supervisor::start(SupervisorStart {
        strategy: SupervisionStrategy::OneForOne,
        children: vec![worker_spec("a", RestartPolicy::Permanent, Arc::clone(&started), Arc::clone(&handle))],
        max_restarts: 3,
        within: Duration::from_millis(1000),
        ..Default::default()
    })
    .await
    .expect("supervisor starts");
    sup.set_parent_sink(parent_observer.clone() as Arc<dyn LifecycleSink>).await;

    assert_eq!(started.load(Ordering::SeqCst), 1);

    // Crash the child 4 times in quick succession (well within the 1s window).
    // The first 3 crashes each succeed in restarting (maxRestarts=3); the 4th
    // trips the intensity window instead of restarting again.
    for crash_num in 1..=4u32 {
        let engine = handle.lock().unwrap_or_else(|poison| poison.into_inner()).clone().expect("child running");
        engine.cast(Ping);
        if crash_num <= 3 {
            let expected = crash_num + 1;
            wait_until(|| started.load(Ordering::SeqCst) == expected).await;
        } else {
            // Give the 4th crash time to be processed; it must not restart.
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    }

    assert_eq!(started.load(Ordering::SeqCst), 4, "3 restarts succeed, the 4th crash trips the window instead");

    let events = parent_observer.events.lock().unwrap_or_else(|poison| poison.into_inner()).clone();
    assert!(
        events.iter().any(|(_, label)| label == "crashed"),
        "parent sink must observe the supervisor's own max-restarts-exceeded failure: {events:?}"
    );
}
