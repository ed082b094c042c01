//! Membership table and gossip delta logic (§4.5).

pub mod gossip;
pub mod member;

pub use gossip::GossipDelta;
pub use member::{ClusterMember, MemberStatus, MembershipTable, NodeDownReason};
