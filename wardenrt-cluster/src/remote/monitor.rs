//! Remote `monitor` subscriptions (§4.6 "monitor").
//!
//! A monitor fires exactly once, from the watcher's point of view: either
//! the target terminates and the owning node sends `MonitorNotify`, or the
//! owning node's connection goes down and the local membership layer
//! synthesizes the same notice. Delivery off the wire is at-least-once (a
//! `MonitorNotify` can be retried or duplicated by a flaky link), so
//! consumption here is idempotent: [`PendingMonitors::notify`] drains and
//! resolves every registered waiter for a target exactly once; any further
//! notify for the same target id is a silent no-op because nothing is left
//! to drain.

use std::collections::HashMap;
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::oneshot;

use wardenrt::util::{ActorId, NodeId};

/// Tracks, per locally-hosted actor, which remote nodes asked to be told
/// when it terminates. Consulted by the router when a local actor's
/// lifecycle sink reports `Terminated`/`Crashed`.
#[derive(Default)]
pub struct LocalWatchers {
    by_target: DashMap<ActorId, Vec<NodeId>>,
}

impl LocalWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, target: ActorId, subscriber: NodeId) {
        self.by_target.entry(target).or_default().push(subscriber);
    }

    /// Remove and return every subscriber node watching `target` (drained
    /// so a later duplicate termination event finds nothing left to notify).
    pub fn drain(&self, target: &ActorId) -> Vec<NodeId> {
        self.by_target.remove(target).map(|(_, v)| v).unwrap_or_default()
    }
}

/// Tracks local `monitor()` callers waiting on a notice about a remote
/// actor. Each call to [`Self::register`] adds one waiter; [`Self::notify`]
/// resolves and removes all waiters for a target at once.
#[derive(Default)]
pub struct PendingMonitors {
    waiters: Mutex<HashMap<ActorId, Vec<oneshot::Sender<String>>>>,
}

impl PendingMonitors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `target`'s termination, returning a receiver
    /// that resolves once, with the termination reason.
    pub fn register(&self, target: ActorId) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = self.waiters.lock().unwrap_or_else(|poison| poison.into_inner());
        waiters.entry(target).or_default().push(tx);
        rx
    }

    /// Resolve every waiter registered for `target` with `reason`. Safe to
    /// call more than once for the same target: the second call finds no
    /// waiters left and does nothing, which is exactly the idempotence
    /// at-least-once delivery requires.
    pub fn notify(&self, target: &ActorId, reason: String) {
        let senders = {
            let mut waiters = self.waiters.lock().unwrap_or_else(|poison| poison.into_inner());
            waiters.remove(target).unwrap_or_default()
        };
        for sender in senders {
            let _ = sender.send(reason.clone());
        }
    }

    /// Resolve every waiter for every target known to be hosted on `node`,
    /// used when that node's connection drops (§4.6: "a node going down
    /// resolves every outstanding monitor on actors it hosted").
    pub fn notify_node_down(&self, targets: &[ActorId], reason: &str) {
        for target in targets {
            self.notify(target, reason.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::new(name, "127.0.0.1", 9000)
    }

    #[test]
    fn local_watchers_drains_once() {
        let watchers = LocalWatchers::new();
        let target = ActorId::new();
        watchers.add(target, node("a"));
        watchers.add(target, node("b"));
        let drained = watchers.drain(&target);
        assert_eq!(drained.len(), 2);
        assert!(watchers.drain(&target).is_empty());
    }

    #[tokio::test]
    async fn pending_monitor_resolves_once_and_is_idempotent_after() {
        let pending = PendingMonitors::new();
        let target = ActorId::new();
        let rx = pending.register(target);
        pending.notify(&target, "normal".to_string());
        assert_eq!(rx.await.expect("resolved"), "normal");

        // Duplicate delivery for the same target: no waiters left, no panic.
        pending.notify(&target, "normal".to_string());
    }

    #[tokio::test]
    async fn multiple_waiters_for_same_target_all_resolve() {
        let pending = PendingMonitors::new();
        let target = ActorId::new();
        let rx1 = pending.register(target);
        let rx2 = pending.register(target);
        pending.notify(&target, "crashed".to_string());
        assert_eq!(rx1.await.expect("resolved"), "crashed");
        assert_eq!(rx2.await.expect("resolved"), "crashed");
    }
}
