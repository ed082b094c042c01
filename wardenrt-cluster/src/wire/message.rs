//! Message kinds carried in `payload.type` (§6 "Wire protocol").
//!
//! `Call`/`CallReply`/`Cast`/`SpawnRequest`/`SpawnReply` carry their actor
//! message/reply/args bodies as pre-encoded CBOR bytes (`Vec<u8>`) rather
//! than a [`crate::wire::WireValue`]: those bodies are produced and consumed
//! by a single, strongly-typed `wardenrt::Actor` impl on each end (see
//! `crate::remote::directory::DynActor`), so re-expressing them through the
//! dynamic value model would only add a lossy round-trip through an
//! untyped representation for no benefit. `WireValue` is reserved for
//! genuinely dynamic data: membership metadata in `Gossip`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wardenrt::util::{ActorAddress, NodeId};

use super::value::WireValue;

/// One cluster member's advertised state, as carried in a `Hello` or
/// `Gossip` frame (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberAdvertisement {
    pub node_id: NodeId,
}

/// `callError.kind` (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallErrorKind {
    ServerNotRunning,
    CallTimeout,
    Unknown,
}

/// `spawnReply.ok | err` (§6 `spawnReply`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpawnOutcome {
    Ok(ActorAddress),
    Err { kind: String, message: String },
}

/// The full set of message kinds exchanged over one cluster connection
/// (§6). One `MessageEnvelope` carries exactly one `WireMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WireMessage {
    /// Handshake opener: advertises identity and protocol capabilities.
    Hello { node_id: NodeId, capabilities: Vec<String> },
    /// Graceful-shutdown notice, sent before closing (§4.5).
    Goodbye { node_id: NodeId },
    /// Liveness beacon (§4.5); carries no payload.
    Heartbeat,
    /// Full-table exchange on handshake, or a periodic delta (§4.5 "Gossip").
    Gossip { add: Vec<MemberAdvertisement>, remove: Vec<NodeId> },
    /// A synchronous call (§4.6).
    Call {
        call_id: Uuid,
        target_handle: ActorAddress,
        msg: Vec<u8>,
        timeout_ms: u64,
        sent_at_ms: i64,
    },
    /// A successful call's reply.
    CallReply { call_id: Uuid, result: Vec<u8> },
    /// A failed call's reply.
    CallError { call_id: Uuid, kind: CallErrorKind, message: String },
    /// Fire-and-forget (§4.6).
    Cast { target_handle: ActorAddress, msg: Vec<u8> },
    /// Remote-spawn request (§4.6).
    SpawnRequest {
        request_id: Uuid,
        behavior_name: String,
        args: Vec<u8>,
        registration: Option<String>,
        name: Option<String>,
    },
    /// Remote-spawn reply.
    SpawnReply { request_id: Uuid, outcome: SpawnOutcome },
    /// Subscribe to one-shot termination notice for a remote actor (§4.6 "monitor").
    MonitorSubscribe { handle: ActorAddress, subscriber: NodeId },
    /// One-shot termination notice for a [`crate::remote::monitor`] subscription.
    MonitorNotify { handle: ActorAddress, reason: String },
    /// Extension point for gossip metadata that doesn't fit the typed
    /// fields above (e.g. custom node tags); kept separate from the
    /// hot-path variants above so they stay free of a `WireValue` dependency.
    GossipMetadata { node_id: NodeId, tags: WireValue },
}

impl WireMessage {
    /// A short label for tracing spans and metrics, independent of `Debug`
    /// formatting (which would include full payload bytes).
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Goodbye { .. } => "goodbye",
            Self::Heartbeat => "heartbeat",
            Self::Gossip { .. } => "gossip",
            Self::Call { .. } => "call",
            Self::CallReply { .. } => "call_reply",
            Self::CallError { .. } => "call_error",
            Self::Cast { .. } => "cast",
            Self::SpawnRequest { .. } => "spawn_request",
            Self::SpawnReply { .. } => "spawn_reply",
            Self::MonitorSubscribe { .. } => "monitor_subscribe",
            Self::MonitorNotify { .. } => "monitor_notify",
            Self::GossipMetadata { .. } => "gossip_metadata",
        }
    }
}
