//! Bridges the engine's lifecycle events into the `monitoring` module.
//!
//! [`crate::monitoring::Monitor`] requires `Clone`, which makes it
//! non-object-safe — exactly the shape the engine needs, since it holds one
//! sink behind `Arc<dyn _>` regardless of which concrete monitor backs it.
//! [`LifecycleSink`] is the object-safe facade; [`MonitorSink`] adapts any
//! `Monitor<ActorEvent>` implementation (the teacher's `InMemoryMonitor` and
//! `NoopMonitor` both qualify unchanged) into one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::monitoring::{ActorEvent, ActorEventKind, Monitor};
use crate::util::ActorId;

/// Object-safe sink for actor lifecycle events.
#[async_trait]
pub trait LifecycleSink: Send + Sync {
    /// Record one lifecycle event for `actor_id`.
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind);
}

/// Adapts a concrete [`Monitor<ActorEvent>`] into a [`LifecycleSink`].
pub struct MonitorSink<M: Monitor<ActorEvent>>(M);

impl<M: Monitor<ActorEvent>> MonitorSink<M> {
    /// Wrap `monitor` for use as an `ActorEngine` lifecycle sink.
    pub fn new(monitor: M) -> Arc<dyn LifecycleSink> {
        Arc::new(Self(monitor))
    }
}

#[async_trait]
impl<M: Monitor<ActorEvent>> LifecycleSink for MonitorSink<M> {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        let event = ActorEvent {
            timestamp: Utc::now(),
            actor_id,
            event_kind: kind,
            metadata: HashMap::new(),
        };
        if let Err(err) = self.0.record(event).await {
            tracing::warn!(error = %err, "failed to record actor lifecycle event");
        }
    }
}

/// Delivers one event to several sinks in order, awaiting each before
/// moving to the next.
///
/// Order matters: `Registry` relies on being listed before any other
/// subscriber so its name-binding cleanup completes before downstream
/// subscribers observe the same `terminated`/`crashed` event (§4.3,
/// §8 "Registry cleanup").
pub struct FanOutSink(Vec<Arc<dyn LifecycleSink>>);

impl FanOutSink {
    /// Build a fan-out over `sinks`, delivered in the given order.
    pub fn new(sinks: Vec<Arc<dyn LifecycleSink>>) -> Arc<dyn LifecycleSink> {
        Arc::new(Self(sinks))
    }
}

#[async_trait]
impl LifecycleSink for FanOutSink {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        for sink in &self.0 {
            sink.emit(actor_id, kind.clone()).await;
        }
    }
}
