//! Resource usage benchmarks:
//! - actor start cost scaling (1 -> 10 -> 50 actors)
//! - mailbox capacity comparison (bounded small vs large)

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::hint::black_box;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use wardenrt::{Actor, ActorContext, ActorEngine, EngineConfig, Message, StartOptions};

#[derive(Debug, Clone)]
struct BenchMessage {
    value: u64,
}

impl Message for BenchMessage {
    const MESSAGE_TYPE: &'static str = "bench_message";
}

#[derive(Debug, thiserror::Error)]
#[error("bench error")]
struct BenchError;

struct TestActor {
    state: u64,
}

#[async_trait]
impl Actor for TestActor {
    type Message = BenchMessage;
    type Reply = ();
    type Error = BenchError;

    async fn handle_call(&mut self, msg: BenchMessage, _ctx: &ActorContext) -> Result<(), BenchError> {
        self.state += msg.value;
        Ok(())
    }

    async fn handle_cast(&mut self, msg: BenchMessage, _ctx: &ActorContext) -> Result<(), BenchError> {
        self.state += msg.value;
        Ok(())
    }
}

fn actor_start_scaling(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("actor_start_scaling");

    for actor_count in [1, 10, 50] {
        group.bench_with_input(
            BenchmarkId::from_parameter(actor_count),
            &actor_count,
            |b, &count| {
                b.to_async(&rt).iter(|| async move {
                    let mut engines = Vec::with_capacity(count);
                    for i in 0..count {
                        let engine = ActorEngine::start(
                            TestActor { state: 0 },
                            StartOptions::new().with_name(format!("actor-{i}")),
                            EngineConfig::default(),
                            None,
                        )
                        .await
                        .expect("start");
                        engines.push(engine);
                    }
                    black_box(engines);
                });
            },
        );
    }

    group.finish();
}

fn mailbox_capacity_comparison(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("mailbox_capacity");

    for capacity in [16usize, 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.to_async(&rt).iter(|| async move {
                    let config = EngineConfig::builder().mailbox_capacity(capacity).build();
                    let engine = ActorEngine::start(
                        TestActor { state: 0 },
                        StartOptions::new(),
                        config,
                        None,
                    )
                    .await
                    .expect("start");
                    for i in 0..capacity.min(64) {
                        engine.cast(BenchMessage { value: i as u64 });
                    }
                    black_box(engine);
                });
            },
        );
    }

    group.finish();
}

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2))
        .without_plots()
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets =
        actor_start_scaling,
        mailbox_capacity_comparison
}

criterion_main!(benches);
