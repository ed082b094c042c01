//! Cluster-layer error taxonomy (§7), split by the subsystem that raises it
//! rather than grown into one enum without bound, matching the precedent
//! `wardenrt::engine::EngineError` / `wardenrt::supervisor::SupervisorError`
//! set for the rest of the workspace.

use thiserror::Error;

use wardenrt::util::NodeId;

/// Failures from the framed-TCP transport (§4.4).
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// A frame exceeded the 16 MiB maximum payload.
    #[error("frame of {0} bytes exceeds the 16 MiB maximum payload")]
    FrameTooLarge(usize),
    /// The envelope payload could not be encoded or decoded.
    #[error("envelope codec error: {0}")]
    Codec(String),
    /// An incoming envelope carried a signature that didn't verify against
    /// the local cluster secret, or carried none when one was required.
    #[error("envelope signature did not verify")]
    SignatureInvalid,
    /// A value being sent used an unsupported wire type (§4.4 "Supported
    /// scalar types"): functions, opaque instances, cycles, weak refs.
    #[error("value is not representable on the wire: {0}")]
    Serialization(String),
    /// The underlying socket failed.
    #[error("transport io error: {0}")]
    Io(String),
    /// The initial handshake did not complete within the connection timeout.
    #[error("handshake with {0} timed out")]
    HandshakeTimeout(NodeId),
    /// The connection closed before a complete frame was read.
    #[error("connection to {0} closed")]
    ConnectionClosed(NodeId),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Failures from membership/gossip and cluster lifecycle (§4.5).
#[derive(Debug, Error, Clone)]
pub enum ClusterError {
    /// `NodeId::parse` rejected a configured or discovered node address.
    #[error("invalid node id: {0}")]
    InvalidNodeId(String),
    /// The local listener could not be bound.
    #[error("failed to bind listener on {host}:{port}: {reason}")]
    BindFailed { host: String, port: u16, reason: String },
    /// A seed could not be reached during join.
    #[error("failed to join seed {0}: {1}")]
    SeedUnreachable(NodeId, String),
    /// The cluster has already been stopped.
    #[error("cluster already stopped")]
    AlreadyStopped,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures from remote call/cast/spawn/monitor (§4.6) and the global
/// registry (§4.7).
#[derive(Debug, Error, Clone)]
pub enum RemoteError {
    /// The target node is not in the connected set.
    #[error("node not reachable: {0}")]
    NodeNotReachable(NodeId),
    /// The target actor does not exist (or no longer exists) on its node.
    #[error("server not running")]
    ServerNotRunning,
    /// A call's deadline elapsed without a reply.
    #[error("call timed out")]
    CallTimeout,
    /// The target actor crashed while the call was in flight.
    #[error("server crashed while handling call")]
    ServerCrashed,
    /// A remote spawn named a behavior absent from the target's behavior registry.
    #[error("behavior not found: {0}")]
    BehaviorNotFound(String),
    /// A remote spawn's target-side actor start failed.
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    /// Some other, unclassified remote failure (§6 `callError.kind == unknown`).
    #[error("unknown remote error: {0}")]
    Unknown(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures from the global (cluster-wide) registry (§4.7).
#[derive(Debug, Error, Clone)]
pub enum GlobalRegistryError {
    #[error("name already registered: {0}")]
    AlreadyRegistered(String),
    #[error("name not registered: {0}")]
    NotRegistered(String),
}

/// Failures from the distributed supervisor (§4.8).
#[derive(Debug, Error, Clone)]
pub enum DistributedSupervisorError {
    #[error("duplicate child id: {0}")]
    DuplicateChild(String),
    #[error("child not found: {0}")]
    ChildNotFound(String),
    #[error("no connected node available to place child {0}")]
    NoNodeAvailable(String),
    #[error("restart intensity exceeded: {max_restarts} restarts within {within_ms}ms")]
    MaxRestartsExceeded { max_restarts: u32, within_ms: u64 },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
