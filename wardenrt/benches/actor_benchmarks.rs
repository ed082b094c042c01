//! Actor lifecycle benchmarks:
//! - single-actor start latency
//! - batch start (10 actors)
//! - call/cast round-trip throughput

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::hint::black_box;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};

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

struct CounterActor {
    count: u64,
}

#[async_trait]
impl Actor for CounterActor {
    type Message = BenchMessage;
    type Reply = u64;
    type Error = BenchError;

    async fn handle_call(&mut self, msg: BenchMessage, _ctx: &ActorContext) -> Result<u64, BenchError> {
        self.count += msg.value;
        Ok(self.count)
    }

    async fn handle_cast(&mut self, msg: BenchMessage, _ctx: &ActorContext) -> Result<(), BenchError> {
        self.count += msg.value;
        Ok(())
    }
}

fn actor_start_single(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("actor_start_single", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = ActorEngine::start(
                CounterActor { count: 0 },
                StartOptions::new(),
                EngineConfig::default(),
                None,
            )
            .await
            .expect("start");
            black_box(engine);
        });
    });
}

fn actor_start_batch_small(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("actor_start_batch_small", |b| {
        b.to_async(&rt).iter(|| async {
            let mut engines = Vec::with_capacity(10);
            for _ in 0..10 {
                let engine = ActorEngine::start(
                    CounterActor { count: 0 },
                    StartOptions::new(),
                    EngineConfig::default(),
                    None,
                )
                .await
                .expect("start");
                engines.push(engine);
            }
            black_box(engines);
        });
    });
}

fn actor_call_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("actor_call_throughput", |b| {
        b.to_async(&rt).iter(|| async {
            let engine = ActorEngine::start(
                CounterActor { count: 0 },
                StartOptions::new(),
                EngineConfig::default(),
                None,
            )
            .await
            .expect("start");

            for i in 0..100 {
                let _ = engine.call(BenchMessage { value: i }, None).await;
            }
            black_box(&engine);
        });
    });
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
        actor_start_single,
        actor_start_batch_small,
        actor_call_throughput
}

criterion_main!(benches);
