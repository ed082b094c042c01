//! The `Actor` trait: the user-supplied behavior the engine drives.
//!
//! An actor owns its state as its own fields (no separate state parameter is
//! threaded through the callbacks, matching how the rest of the workspace
//! models ownership: whoever holds `&mut self` holds the only writable
//! reference that exists). `handle_call` and `handle_cast` are never invoked
//! concurrently with each other or with themselves for the same actor — the
//! worker loop in [`crate::engine::ActorEngine`] enforces that by
//! construction, one mailbox item at a time.

use async_trait::async_trait;

use super::context::ActorContext;
use crate::message::Message;

/// User-provided behavior for one actor.
///
/// `init`/`handle_call`/`handle_cast` may fail; a failure is a crash — it is
/// never caught here, it propagates to the engine, which tears the actor
/// down and reports it to any supervisor. `terminate` cannot fail: it is the
/// last thing run for an actor and there is nothing left to report a
/// failure to except a log line, which implementations should emit
/// themselves if they need to.
#[async_trait]
pub trait Actor: Send + 'static {
    /// The message type this actor's mailbox carries.
    type Message: Message;
    /// What a successful `call` returns.
    type Reply: Send + 'static;
    /// The error type any callback may fail with.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs once, synchronously from the caller's point of view, before
    /// [`crate::engine::ActorEngine::start`] returns. Default: no-op.
    async fn init(&mut self, _ctx: &ActorContext) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Handle a synchronous `call`: the caller is awaiting `Self::Reply`.
    async fn handle_call(
        &mut self,
        msg: Self::Message,
        ctx: &ActorContext,
    ) -> Result<Self::Reply, Self::Error>;

    /// Handle a fire-and-forget `cast`.
    async fn handle_cast(&mut self, msg: Self::Message, ctx: &ActorContext) -> Result<(), Self::Error>;

    /// Runs once on the way to `stopped`, for both a clean stop and a crash.
    /// Default: no-op. Errors are not propagated — this is terminal.
    async fn terminate(&mut self, _reason: &crate::actor::TerminationReason, _ctx: &ActorContext) {}
}

/// An [`Actor`] that opts into snapshot persistence (§4.10 "Actor
/// integration"): `ActorEngine::start_persistent` loads any existing
/// snapshot before `init` runs, and checkpoints state afterward according to
/// the configured [`crate::engine::CheckpointPolicy`].
pub trait PersistentActor: Actor {
    /// The storage key this actor's state is saved and loaded under. Stable
    /// across restarts — typically derived from the actor's registered name
    /// or a caller-supplied identity, not from anything generated fresh on
    /// each start.
    fn persistence_key(&self) -> String;

    /// The schema this actor currently serializes to. Bump this when
    /// `snapshot_state`'s shape changes incompatibly.
    fn schema_version(&self) -> u32 {
        1
    }

    /// Serialize current state for checkpointing.
    fn snapshot_state(&self) -> serde_json::Value;

    /// Restore from a previously persisted snapshot, run before `init`.
    /// Implementations that can upgrade an older `schema_version` in place
    /// should do so here; returning `Err` fails `start_persistent` with
    /// `EngineError::StateRestoreIncompatible`, matching §4.10's
    /// schema-version-mismatch behavior when no upgrade path exists.
    fn restore_state(&mut self, snapshot: crate::engine::Snapshot) -> Result<(), Self::Error>;
}
