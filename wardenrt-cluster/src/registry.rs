//! Cluster-wide name registry (§4.7).
//!
//! Same shape as `wardenrt::registry::Registry`, generalized to a
//! cluster-wide binding and a partition-heal conflict rule: when gossip
//! reveals two nodes hold conflicting registrations for the same name, the
//! registration owned by the lexicographically smaller `NodeId` wins; the
//! losing side's binding is dropped and its owner notified so it can
//! re-register under a different name if it still needs one.

use async_trait::async_trait;
use dashmap::DashMap;

use wardenrt::engine::LifecycleSink;
use wardenrt::monitoring::ActorEventKind;
use wardenrt::util::{ActorAddress, ActorId, NodeId};

use crate::error::GlobalRegistryError;

/// The outcome of reconciling a conflicting registration discovered during
/// partition heal: `None` if the local registration won (nothing to do),
/// `Some(name)` if it lost and was dropped — the caller notifies the losing
/// owner.
pub struct ConflictResolution {
    pub name: String,
    pub kept_owner: NodeId,
}

/// `name -> handle` bindings, cluster-wide.
pub struct GlobalRegistry {
    by_name: DashMap<String, ActorAddress>,
    names_by_id: DashMap<ActorId, String>,
}

impl GlobalRegistry {
    pub fn new() -> Self {
        Self { by_name: DashMap::new(), names_by_id: DashMap::new() }
    }

    pub fn register(&self, name: impl Into<String>, handle: ActorAddress) -> Result<(), GlobalRegistryError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(GlobalRegistryError::AlreadyRegistered(name));
        }
        self.names_by_id.insert(*handle.id(), name.clone());
        self.by_name.insert(name, handle);
        Ok(())
    }

    pub fn unregister(&self, name: &str) {
        if let Some((_, handle)) = self.by_name.remove(name) {
            self.names_by_id.remove(handle.id());
        }
    }

    pub fn lookup(&self, name: &str) -> Result<ActorAddress, GlobalRegistryError> {
        self.whereis(name).ok_or_else(|| GlobalRegistryError::NotRegistered(name.to_string()))
    }

    pub fn whereis(&self, name: &str) -> Option<ActorAddress> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get_names(&self) -> Vec<String> {
        self.by_name.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Reconcile a registration for `name` learned from a remote node
    /// (`remote_owner`, `remote_handle`) against whatever is locally known.
    /// If no local binding exists, the remote one is adopted. If both
    /// exist for different actors, the lexicographically smaller owning
    /// `NodeId` wins; the loser's binding (local or remote) is dropped.
    /// Returns the name and the node whose registration survives, so the
    /// caller can notify a dropped remote or local owner as needed.
    pub fn reconcile(
        &self,
        name: &str,
        remote_owner: &NodeId,
        remote_handle: ActorAddress,
    ) -> ConflictResolution {
        let Some(local_handle) = self.whereis(name) else {
            let _ = self.register(name, remote_handle);
            return ConflictResolution { name: name.to_string(), kept_owner: remote_owner.clone() };
        };

        if local_handle.id() == remote_handle.id() {
            return ConflictResolution {
                name: name.to_string(),
                kept_owner: local_handle.node_id().cloned().unwrap_or_else(|| remote_owner.clone()),
            };
        }

        let local_owner = local_handle.node_id().cloned().unwrap_or_else(|| remote_owner.clone());
        if remote_owner < &local_owner {
            self.unregister(name);
            let _ = self.register(name, remote_handle);
            ConflictResolution { name: name.to_string(), kept_owner: remote_owner.clone() }
        } else {
            ConflictResolution { name: name.to_string(), kept_owner: local_owner }
        }
    }
}

impl Default for GlobalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleSink for GlobalRegistry {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        if matches!(kind, ActorEventKind::Terminated { .. } | ActorEventKind::Crashed { .. }) {
            if let Some((_, name)) = self.names_by_id.remove(&actor_id) {
                self.by_name.remove(&name);
                tracing::debug!(%name, "global registry: cleaned up binding on actor termination");
            }
        }
    }
}
