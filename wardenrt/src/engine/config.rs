//! Engine-wide configuration, built with the teacher's builder pattern
//! (`SystemConfigBuilder` generalized to `EngineConfigBuilder`).

use std::time::Duration;

/// Tunables for every actor the engine starts.
///
/// Mirrors §6's engine-level config recognized fields that apply locally
/// (`shutdownGraceMs` belongs to the cluster-wide shutdown sequence and
/// lives on `wardenrt_cluster::ClusterConfig` instead).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on each actor's mailbox; `cast` uses `try_send` against this
    /// bound so it never blocks, per §4.1.
    pub mailbox_capacity: usize,
    /// Default `call` timeout when the caller doesn't specify one. §4.1: 5000ms.
    pub default_call_timeout: Duration,
    /// Default `stop` timeout when the caller doesn't specify one. §4.1: 5000ms.
    pub default_shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            default_call_timeout: Duration::from_millis(5000),
            default_shutdown_timeout: Duration::from_millis(5000),
        }
    }
}

impl EngineConfig {
    /// Start building a config from defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    inner: EngineConfig,
}

impl EngineConfigBuilder {
    /// Override the mailbox capacity.
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.inner.mailbox_capacity = capacity;
        self
    }

    /// Override the default call timeout.
    pub fn default_call_timeout(mut self, timeout: Duration) -> Self {
        self.inner.default_call_timeout = timeout;
        self
    }

    /// Override the default shutdown timeout.
    pub fn default_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.inner.default_shutdown_timeout = timeout;
        self
    }

    /// Finish building.
    pub fn build(self) -> EngineConfig {
        self.inner
    }
}
