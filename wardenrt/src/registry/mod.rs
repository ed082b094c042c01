//! Local name registry (§4.3).
//!
//! Layered on the teacher's `DashMap`-based address routing table idiom
//! (`broker::ActorRegistry`, since removed along with the generic broker it
//! routed for) with the uniqueness and auto-cleanup semantics §4.3 adds:
//! `register` rejects a duplicate name, and a registered binding is removed
//! synchronously inside the `terminated`/`crashed` lifecycle event handler —
//! *before* the event reaches any other subscriber — by implementing
//! [`LifecycleSink`] itself and sitting first in an
//! [`crate::engine::FanOutSink`].

pub mod error;

pub use error::RegistryError;

use dashmap::DashMap;

use crate::engine::{ActorHandle, LifecycleSink};
use crate::monitoring::ActorEventKind;
use crate::util::ActorId;
use async_trait::async_trait;

/// `name -> handle` bindings for actors local to this engine.
pub struct Registry {
    by_name: DashMap<String, ActorHandle>,
    names_by_id: DashMap<ActorId, String>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            names_by_id: DashMap::new(),
        }
    }

    /// Bind `name` to `handle`. Fails if `name` is already bound.
    pub fn register(&self, name: impl Into<String>, handle: ActorHandle) -> Result<(), RegistryError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.names_by_id.insert(*handle.id(), name.clone());
        self.by_name.insert(name, handle);
        Ok(())
    }

    /// Remove `name`'s binding, if any. Idempotent.
    pub fn unregister(&self, name: &str) {
        if let Some((_, handle)) = self.by_name.remove(name) {
            self.names_by_id.remove(handle.id());
        }
    }

    /// Resolve `name`, failing with `NotRegistered` if unbound.
    pub fn lookup(&self, name: &str) -> Result<ActorHandle, RegistryError> {
        self.whereis(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    /// Resolve `name`, returning `None` instead of failing.
    pub fn whereis(&self, name: &str) -> Option<ActorHandle> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    /// Whether `name` currently has a binding.
    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of bindings currently held.
    pub fn count(&self) -> usize {
        self.by_name.len()
    }

    /// All currently-bound names, in no particular order.
    pub fn get_names(&self) -> Vec<String> {
        self.by_name.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleSink for Registry {
    async fn emit(&self, actor_id: ActorId, kind: ActorEventKind) {
        if matches!(kind, ActorEventKind::Terminated { .. } | ActorEventKind::Crashed { .. }) {
            if let Some((_, name)) = self.names_by_id.remove(&actor_id) {
                self.by_name.remove(&name);
                tracing::debug!(%name, "registry: cleaned up binding on actor termination");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ActorAddress;

    #[test]
    fn register_lookup_unregister_roundtrip() {
        let registry = Registry::new();
        let handle = ActorAddress::anonymous();
        registry.register("worker", handle.clone()).unwrap();
        assert_eq!(registry.lookup("worker").unwrap(), handle);
        assert!(registry.is_registered("worker"));
        registry.unregister("worker");
        assert!(registry.lookup("worker").is_err());
        // idempotent
        registry.unregister("worker");
    }

    #[test]
    fn duplicate_register_fails() {
        let registry = Registry::new();
        registry.register("worker", ActorAddress::anonymous()).unwrap();
        let err = registry.register("worker", ActorAddress::anonymous()).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn terminated_event_cleans_up_binding_before_returning() {
        let registry = Registry::new();
        let handle = ActorAddress::anonymous();
        registry.register("worker", handle.clone()).unwrap();

        LifecycleSink::emit(
            &registry,
            *handle.id(),
            ActorEventKind::Terminated { reason: "normal".into() },
        )
        .await;

        assert!(registry.lookup("worker").is_err());
        assert_eq!(registry.count(), 0);
    }
}
