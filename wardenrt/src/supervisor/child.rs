//! The object-safe `Child` trait the supervisor manages, and the adapter
//! that lets any [`crate::engine::ActorEngine`] satisfy it.
//!
//! Kept deliberately separate from [`crate::actor::Actor`] (the teacher's
//! supervisor framework makes the same split): a supervisor's ordered child
//! list needs to hold actors of unrelated `Behavior` types side by side,
//! which only works if children are stored behind a common object-safe
//! trait rather than `ActorEngine<A>` directly.

use std::time::Duration;

use async_trait::async_trait;

use super::error::SupervisorError;
use crate::actor::{Actor, TerminationReason};
use crate::engine::ActorEngine;
use crate::util::ActorId;

/// A supervised, already-running child.
#[async_trait]
pub trait Child: Send + Sync {
    /// Stop this child, waiting up to `timeout` for `terminate` to finish.
    async fn stop(&self, reason: TerminationReason, timeout: Duration) -> Result<(), SupervisorError>;

    /// Whether the child is still running.
    fn is_alive(&self) -> bool;

    /// The underlying actor id, used to correlate lifecycle events with
    /// this child's entry in the supervisor's child list.
    fn actor_id(&self) -> ActorId;
}

/// Adapts an [`ActorEngine<A>`] into a [`Child`].
pub struct ActorChild<A: Actor>(pub ActorEngine<A>);

#[async_trait]
impl<A: Actor> Child for ActorChild<A> {
    async fn stop(&self, reason: TerminationReason, timeout: Duration) -> Result<(), SupervisorError> {
        self.0
            .stop(reason.to_string(), Some(timeout))
            .await
            .map_err(|err| SupervisorError::ChildStopFailed(err.to_string()))
    }

    fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    fn actor_id(&self) -> ActorId {
        *self.0.handle().id()
    }
}
