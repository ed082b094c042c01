//! # wardenrt-cluster — location-transparent clustering for `wardenrt`
//!
//! Framed-TCP transport with optional HMAC envelope signing, seed-based
//! gossip membership, correlation-id remote call/cast/spawn/monitor, a
//! cluster-wide name registry, and a distributed supervisor that places
//! children across connected nodes and fails them over on `nodeDown`.
//!
//! [`cluster::Cluster`] is the entry point: it owns one node's membership
//! table, connection set, behavior registry, and global registry, and
//! drives the background tasks (listener, heartbeat, gossip, dispatch)
//! that keep them current.
//!
//! # Module organization
//!
//! - [`config`] — `ClusterConfig`: node identity, seeds, heartbeat/timeout tuning
//! - [`wire`] — the framed envelope, typed-union wire messages, CBOR codec
//! - [`transport`] — per-peer TCP connection lifecycle and reconnect backoff
//! - [`membership`] — the connected-node table and gossip delta logic
//! - [`remote`] — type-erased local dispatch, the behavior registry, the router
//! - [`registry`] — the cluster-wide name registry
//! - [`supervisor`] — node-selector placement and `nodeDown` failover
//! - [`cluster`] — `Cluster`, wiring everything above into one running node
//! - [`error`] — the per-subsystem error taxonomy

pub mod cluster;
pub mod config;
pub mod error;
pub mod membership;
pub mod registry;
pub mod remote;
pub mod supervisor;
pub mod transport;
pub mod wire;

pub use cluster::Cluster;
pub use config::{ClusterConfig, ClusterConfigBuilder};
pub use error::{ClusterError, DistributedSupervisorError, GlobalRegistryError, RemoteError, TransportError};
pub use membership::{ClusterMember, GossipDelta, MemberStatus, MembershipTable, NodeDownReason};
pub use registry::GlobalRegistry;
pub use remote::{ActorDirectory, BehaviorRegistry, DynActor, RemoteRouter, TypedDynActor};
pub use supervisor::{DistributedChildSpec, DistributedSupervisor, NodeSelector, SelectionContext};
pub use wire::{CallErrorKind, EnvelopeCodec, MessageEnvelope, WireMessage, WireValue};
