//! Gossip delta computation and application (§4.5 "Gossip").
//!
//! Full-table exchange happens inline in the handshake path
//! (`crate::cluster`): a `Gossip` frame whose `add` list is every
//! currently-known node. Periodic deltas are computed here by diffing two
//! successive snapshots of the local [`super::member::MembershipTable`].

use std::collections::HashSet;

use wardenrt::util::NodeId;

use super::member::MembershipTable;
use crate::wire::message::MemberAdvertisement;

/// `(add, remove)` since the last periodic gossip tick, per §4.5.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GossipDelta {
    pub add: Vec<NodeId>,
    pub remove: Vec<NodeId>,
}

impl GossipDelta {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    pub fn into_advertisements(self) -> (Vec<MemberAdvertisement>, Vec<NodeId>) {
        let add = self.add.into_iter().map(|node_id| MemberAdvertisement { node_id }).collect();
        (add, self.remove)
    }
}

/// Diff `previous` (the connected set as of the last tick) against the
/// table's current connected set.
pub fn compute_delta(table: &MembershipTable, previous: &HashSet<NodeId>) -> GossipDelta {
    let current: HashSet<NodeId> = table.connected_nodes().into_iter().collect();
    let add = current.difference(previous).cloned().collect();
    let remove = previous.difference(&current).cloned().collect();
    GossipDelta { add, remove }
}

/// Apply an incoming gossip frame's `(add, remove)` to the local table,
/// returning the newly-discovered node ids (callers connect to these in
/// turn, per §4.5 "Join": "Discovered nodes are connected to in turn").
pub fn apply_delta(
    table: &MembershipTable,
    add: Vec<MemberAdvertisement>,
    remove: Vec<NodeId>,
    local: &NodeId,
) -> Vec<NodeId> {
    let mut discovered = Vec::new();
    for advertisement in add {
        if &advertisement.node_id == local {
            continue;
        }
        if !table.is_connected(&advertisement.node_id) {
            discovered.push(advertisement.node_id.clone());
        }
    }
    for node_id in remove {
        table.mark_disconnected(&node_id);
    }
    discovered
}
