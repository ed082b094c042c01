//! The per-actor mailbox item.
//!
//! Calls and casts share one `tokio::sync::mpsc` channel — there is no
//! priority lane for calls, matching §4.1's "Mailbox order" rule exactly:
//! a bounded mpsc channel already guarantees strict FIFO delivery per
//! sender, and per-target ordering across senders is simply arrival order.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::actor::{Actor, TerminationReason};
use crate::engine::error::EngineError;

/// One entry in an actor's mailbox.
pub(crate) enum MailboxItem<A: Actor> {
    /// A synchronous call awaiting a reply.
    Call {
        msg: A::Message,
        #[allow(dead_code)]
        corr_id: Uuid,
        reply_tx: oneshot::Sender<Result<A::Reply, EngineError>>,
    },
    /// A fire-and-forget cast.
    Cast { msg: A::Message },
    /// A stop signal; `ack` is fired once `terminate` has returned.
    Stop {
        reason: TerminationReason,
        ack: oneshot::Sender<()>,
    },
    /// An out-of-band checkpoint request for a persistent actor (§4.10
    /// "on explicit request"), processed in mailbox order like anything else.
    Checkpoint { ack: oneshot::Sender<Result<(), EngineError>> },
}
