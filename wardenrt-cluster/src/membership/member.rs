//! [`ClusterMember`] and the shared membership table (§3, §4.5).

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use wardenrt::util::NodeId;

/// A peer's connectedness, per §3: "A node is *up* only in `connected`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Why a node was marked down (§4.5 "Heartbeat").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDownReason {
    HeartbeatTimeout,
    ConnectionClosed,
    GracefulShutdown,
}

impl NodeDownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::ConnectionClosed => "connection_closed",
            Self::GracefulShutdown => "graceful_shutdown",
        }
    }
}

/// One entry in the membership table.
#[derive(Debug, Clone)]
pub struct ClusterMember {
    pub node_id: NodeId,
    pub status: MemberStatus,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl ClusterMember {
    pub fn connecting(node_id: NodeId) -> Self {
        Self { node_id, status: MemberStatus::Connecting, last_heartbeat_at: Utc::now() }
    }

    pub fn is_up(&self) -> bool {
        self.status == MemberStatus::Connected
    }
}

/// Shared, concurrently-accessed view of cluster membership. One instance
/// per node, updated by the heartbeat loop, gossip handler, and the
/// connection-accept/connect paths.
#[derive(Default)]
pub struct MembershipTable {
    members: DashMap<NodeId, ClusterMember>,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self { members: DashMap::new() }
    }

    /// Mark `node_id` connected (or insert it as such), bumping its
    /// heartbeat clock.
    pub fn mark_connected(&self, node_id: NodeId) {
        self.members
            .entry(node_id.clone())
            .and_modify(|m| {
                m.status = MemberStatus::Connected;
                m.last_heartbeat_at = Utc::now();
            })
            .or_insert_with(|| ClusterMember {
                node_id,
                status: MemberStatus::Connected,
                last_heartbeat_at: Utc::now(),
            });
    }

    /// Record fresh traffic from `node_id` (any frame counts, not just
    /// heartbeats, per §4.5: "no heartbeat **or other traffic**").
    pub fn touch(&self, node_id: &NodeId) {
        if let Some(mut entry) = self.members.get_mut(node_id) {
            entry.last_heartbeat_at = Utc::now();
        }
    }

    /// Mark `node_id` disconnected. Returns `true` if it was previously
    /// connected (i.e. this is a real transition, not a no-op).
    pub fn mark_disconnected(&self, node_id: &NodeId) -> bool {
        if let Some(mut entry) = self.members.get_mut(node_id) {
            let was_up = entry.is_up();
            entry.status = MemberStatus::Disconnected;
            was_up
        } else {
            false
        }
    }

    pub fn remove(&self, node_id: &NodeId) {
        self.members.remove(node_id);
    }

    pub fn get(&self, node_id: &NodeId) -> Option<ClusterMember> {
        self.members.get(node_id).map(|entry| entry.clone())
    }

    pub fn is_connected(&self, node_id: &NodeId) -> bool {
        self.members.get(node_id).is_some_and(|m| m.is_up())
    }

    /// All currently connected node ids, in no particular order.
    pub fn connected_nodes(&self) -> Vec<NodeId> {
        self.members
            .iter()
            .filter(|entry| entry.is_up())
            .map(|entry| entry.node_id.clone())
            .collect()
    }

    /// Every node this table knows about, alive or not.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.members.iter().map(|entry| entry.node_id.clone()).collect()
    }

    /// Peers whose last heartbeat is older than `timeout` and are still
    /// marked connected — candidates the heartbeat loop should declare down.
    pub fn stale_peers(&self, timeout: chrono::Duration) -> Vec<NodeId> {
        let now = Utc::now();
        self.members
            .iter()
            .filter(|entry| entry.is_up() && now.signed_duration_since(entry.last_heartbeat_at) > timeout)
            .map(|entry| entry.node_id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<ClusterMember> {
        self.members.iter().map(|entry| entry.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::new(name, "127.0.0.1", 9000)
    }

    #[test]
    fn mark_connected_then_disconnected() {
        let table = MembershipTable::new();
        table.mark_connected(node("a"));
        assert!(table.is_connected(&node("a")));
        assert!(table.mark_disconnected(&node("a")));
        assert!(!table.is_connected(&node("a")));
    }

    #[test]
    fn disconnecting_unknown_node_is_not_a_transition() {
        let table = MembershipTable::new();
        assert!(!table.mark_disconnected(&node("ghost")));
    }

    #[test]
    fn stale_peers_after_timeout() {
        let table = MembershipTable::new();
        table.mark_connected(node("a"));
        if let Some(mut entry) = table.members.get_mut(&node("a")) {
            entry.last_heartbeat_at = Utc::now() - chrono::Duration::seconds(10);
        }
        let stale = table.stale_peers(chrono::Duration::seconds(5));
        assert_eq!(stale, vec![node("a")]);
    }
}
