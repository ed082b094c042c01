//! Type-erased delivery target so one [`TimerService`](super::TimerService)
//! can fire timers at actors of any message type.

use async_trait::async_trait;
use wardenrt::{Actor, ActorEngine};

/// A destination a timer can cast a fire-event to.
///
/// `ActorContext` has no handle back to its own engine by design, so a
/// `TimerTarget` is always resolved externally — via [`EngineTarget`] holding
/// a clone of the target's `ActorEngine` — rather than reached through any
/// self-referential mechanism on the actor side.
#[async_trait]
pub trait TimerTarget: Send + Sync {
    /// Stable key this target was registered under, persisted on the
    /// [`super::TimerEntry`] so it can be re-resolved after a restart.
    fn target_key(&self) -> &str;

    /// Deliver a due fire's payload as a cast. Best-effort: a target that has
    /// stopped silently drops the message, same as any other `cast`.
    async fn deliver(&self, payload: serde_json::Value);
}

/// Adapts a concrete actor's `ActorEngine` into a [`TimerTarget`] by
/// deserializing the stored JSON payload into that actor's message type.
pub struct EngineTarget<A: Actor>
where
    A::Message: serde::de::DeserializeOwned,
{
    key: String,
    engine: ActorEngine<A>,
}

impl<A: Actor> EngineTarget<A>
where
    A::Message: serde::de::DeserializeOwned,
{
    pub fn new(key: impl Into<String>, engine: ActorEngine<A>) -> Self {
        Self { key: key.into(), engine }
    }
}

#[async_trait]
impl<A: Actor> TimerTarget for EngineTarget<A>
where
    A::Message: serde::de::DeserializeOwned,
{
    fn target_key(&self) -> &str {
        &self.key
    }

    async fn deliver(&self, payload: serde_json::Value) {
        match serde_json::from_value::<A::Message>(payload) {
            Ok(msg) => self.engine.cast(msg),
            Err(error) => {
                tracing::warn!(target_key = %self.key, %error, "timer fire payload did not match target message type");
            }
        }
    }
}
