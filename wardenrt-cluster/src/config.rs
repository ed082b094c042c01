//! Cluster-wide configuration, built with the same builder pattern
//! `wardenrt::engine::EngineConfigBuilder` uses (§6 "Environment/config
//! recognized at engine level").

use std::time::Duration;

use wardenrt::util::NodeId;

/// Tunables for one node's participation in the cluster.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// This node's own identity, e.g. `node1@10.0.0.1:9000`.
    pub node_id: NodeId,
    /// Seed addresses used to bootstrap membership on join (§4.5).
    pub seeds: Vec<NodeId>,
    /// Shared secret used to HMAC-sign outgoing envelopes; `None` disables
    /// signing and accepts unsigned incoming envelopes (§4.4 "Authentication").
    pub cluster_secret: Option<String>,
    /// Heartbeat interval; a peer is declared down after `3 * heartbeat_ms`
    /// with no traffic (§4.5). Default 1000ms.
    pub heartbeat_ms: u64,
    /// Grace period `Cluster::stop` waits for pending calls to drain before
    /// closing connections (§5 "Resource policy"). Default 2000ms.
    pub shutdown_grace_ms: u64,
    /// Connection timeout for the initial handshake (§4.4). Default 5000ms.
    pub handshake_timeout: Duration,
}

impl ClusterConfig {
    /// Start building a config for `node_id`.
    pub fn builder(node_id: NodeId) -> ClusterConfigBuilder {
        ClusterConfigBuilder::new(node_id)
    }

    /// `3 * heartbeat_ms`, the duration of silence after which a peer is
    /// declared down (§4.5).
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms * 3)
    }

    /// `10 * heartbeat_ms`, the window over which membership must converge
    /// if no further changes occur (§4.5 "Gossip").
    pub fn convergence_window(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms * 10)
    }
}

/// Builder for [`ClusterConfig`].
pub struct ClusterConfigBuilder {
    inner: ClusterConfig,
}

impl ClusterConfigBuilder {
    fn new(node_id: NodeId) -> Self {
        Self {
            inner: ClusterConfig {
                node_id,
                seeds: Vec::new(),
                cluster_secret: None,
                heartbeat_ms: 1000,
                shutdown_grace_ms: 2000,
                handshake_timeout: Duration::from_millis(5000),
            },
        }
    }

    /// Add one seed node to connect to on join.
    pub fn seed(mut self, seed: NodeId) -> Self {
        self.inner.seeds.push(seed);
        self
    }

    /// Replace the full seed list.
    pub fn seeds(mut self, seeds: Vec<NodeId>) -> Self {
        self.inner.seeds = seeds;
        self
    }

    /// Set the shared secret used to sign/verify envelopes.
    pub fn cluster_secret(mut self, secret: impl Into<String>) -> Self {
        self.inner.cluster_secret = Some(secret.into());
        self
    }

    /// Override the heartbeat interval.
    pub fn heartbeat_ms(mut self, ms: u64) -> Self {
        self.inner.heartbeat_ms = ms;
        self
    }

    /// Override the graceful-shutdown drain period.
    pub fn shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.inner.shutdown_grace_ms = ms;
        self
    }

    /// Override the initial-handshake connection timeout.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.inner.handshake_timeout = timeout;
        self
    }

    /// Finish building.
    pub fn build(self) -> ClusterConfig {
        self.inner
    }
}
