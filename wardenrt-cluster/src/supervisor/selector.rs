//! Child placement policy for the distributed supervisor (§4.8 `nodeSelector`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;

use wardenrt::util::NodeId;

/// What the supervisor knows about the cluster at placement time, handed to
/// a [`NodeSelector::Custom`] closure so it can make an informed choice
/// without reaching back into `Cluster` itself.
pub struct SelectionContext<'a> {
    /// Currently connected nodes, excluding any caller-supplied exclusions
    /// (e.g. the node that just went down during failover).
    pub candidates: &'a [NodeId],
    /// This node's own id, for `local_first`.
    pub local_node: &'a NodeId,
    /// Child count currently placed on each candidate, for `least_loaded`.
    pub load: &'a dyn Fn(&NodeId) -> usize,
}

/// `nodeSelector` (§4.8): how a distributed-supervisor child picks which
/// node to run on.
#[derive(Clone)]
pub enum NodeSelector {
    /// Prefer the local node if connected/eligible, else fall back to
    /// round-robin over the remaining candidates.
    LocalFirst,
    /// Cycle through candidates in order, one placement per tick of a
    /// shared counter.
    RoundRobin(Arc<AtomicUsize>),
    /// Pick the candidate with the fewest children currently placed on it.
    LeastLoaded,
    /// Pick uniformly at random among candidates.
    Random,
    /// Pin to one specific node; failover still re-places on `nodeDown` for
    /// that exact node once it becomes excluded, retrying once it rejoins.
    Node(NodeId),
    /// Caller-supplied policy.
    Custom(Arc<dyn Fn(&SelectionContext) -> Option<NodeId> + Send + Sync>),
}

impl std::fmt::Debug for NodeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalFirst => write!(f, "LocalFirst"),
            Self::RoundRobin(_) => write!(f, "RoundRobin"),
            Self::LeastLoaded => write!(f, "LeastLoaded"),
            Self::Random => write!(f, "Random"),
            Self::Node(n) => write!(f, "Node({n})"),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl NodeSelector {
    pub fn round_robin() -> Self {
        Self::RoundRobin(Arc::new(AtomicUsize::new(0)))
    }

    /// Choose a node from `ctx.candidates`, or `None` if none qualify
    /// (§4.8: "If no nodes are available, child enters a waiting state").
    pub fn select(&self, ctx: &SelectionContext) -> Option<NodeId> {
        if ctx.candidates.is_empty() {
            return None;
        }
        match self {
            Self::LocalFirst => {
                if ctx.candidates.contains(ctx.local_node) {
                    Some(ctx.local_node.clone())
                } else {
                    ctx.candidates.first().cloned()
                }
            }
            Self::RoundRobin(counter) => {
                let idx = counter.fetch_add(1, Ordering::Relaxed) % ctx.candidates.len();
                ctx.candidates.get(idx).cloned()
            }
            Self::LeastLoaded => ctx
                .candidates
                .iter()
                .min_by_key(|node| (ctx.load)(node))
                .cloned(),
            Self::Random => {
                let idx = rand::thread_rng().gen_range(0..ctx.candidates.len());
                ctx.candidates.get(idx).cloned()
            }
            Self::Node(target) => ctx.candidates.iter().find(|n| *n == target).cloned(),
            Self::Custom(f) => f(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::new(name, "127.0.0.1", 9000)
    }

    fn ctx<'a>(candidates: &'a [NodeId], local: &'a NodeId, load: &'a dyn Fn(&NodeId) -> usize) -> SelectionContext<'a> {
        SelectionContext { candidates, local_node: local, load }
    }

    #[test]
    fn local_first_prefers_local_node() {
        let local = node("alpha");
        let candidates = vec![node("beta"), node("alpha")];
        let no_load = |_: &NodeId| 0;
        let selector = NodeSelector::LocalFirst;
        assert_eq!(selector.select(&ctx(&candidates, &local, &no_load)), Some(local));
    }

    #[test]
    fn local_first_falls_back_when_local_absent() {
        let local = node("alpha");
        let candidates = vec![node("beta"), node("gamma")];
        let no_load = |_: &NodeId| 0;
        let selector = NodeSelector::LocalFirst;
        assert_eq!(selector.select(&ctx(&candidates, &local, &no_load)), Some(node("beta")));
    }

    #[test]
    fn round_robin_cycles() {
        let local = node("alpha");
        let candidates = vec![node("a"), node("b"), node("c")];
        let no_load = |_: &NodeId| 0;
        let selector = NodeSelector::round_robin();
        let picks: Vec<_> = (0..4)
            .map(|_| selector.select(&ctx(&candidates, &local, &no_load)).unwrap())
            .collect();
        assert_eq!(picks, vec![node("a"), node("b"), node("c"), node("a")]);
    }

    #[test]
    fn least_loaded_picks_minimum() {
        let local = node("alpha");
        let candidates = vec![node("a"), node("b"), node("c")];
        let load = |n: &NodeId| if n == &node("b") { 0 } else { 5 };
        let selector = NodeSelector::LeastLoaded;
        assert_eq!(selector.select(&ctx(&candidates, &local, &load)), Some(node("b")));
    }

    #[test]
    fn pinned_node_must_be_in_candidates() {
        let local = node("alpha");
        let candidates = vec![node("a")];
        let no_load = |_: &NodeId| 0;
        let selector = NodeSelector::Node(node("b"));
        assert_eq!(selector.select(&ctx(&candidates, &local, &no_load)), None);
    }

    #[test]
    fn empty_candidates_yields_none() {
        let local = node("alpha");
        let candidates: Vec<NodeId> = vec![];
        let no_load = |_: &NodeId| 0;
        assert_eq!(NodeSelector::LocalFirst.select(&ctx(&candidates, &local, &no_load)), None);
    }
}
