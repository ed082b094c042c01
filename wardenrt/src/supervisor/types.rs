//! Supervisor type vocabulary: child identity, restart policy, strategy,
//! restart intensity and auto-shutdown policy (§3 "Supervisor record", §4.2).

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::SupervisorError;
use crate::engine::LifecycleSink;

/// Identifier of a child within one supervisor. Unique within that
/// supervisor's child list (§3: "Within one supervisor `id` is unique").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildId(String);

impl ChildId {
    /// Wrap a caller-supplied id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh id for a dynamically-started `simple_one_for_one` child.
    pub fn generated() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When a child should be restarted after termination (§4.2 "Restart decision").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Always restart, regardless of termination reason.
    Permanent,
    /// Restart only when the termination reason is abnormal.
    Transient,
    /// Never restart.
    Temporary,
}

impl RestartPolicy {
    /// Whether a child terminating with `abnormal` should be restarted.
    pub fn should_restart(&self, abnormal: bool) -> bool {
        match self {
            Self::Permanent => true,
            Self::Transient => abnormal,
            Self::Temporary => false,
        }
    }
}

/// Which siblings are restarted when one child fails (§4.2 "Strategies").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionStrategy {
    /// Restart only the failed child.
    OneForOne,
    /// Terminate all remaining children (reverse order), then restart all (forward).
    OneForAll,
    /// Terminate the failed child and everything started after it (reverse),
    /// then restart them (forward).
    RestForOne,
    /// Dynamic children of a single template, started via `start_child`.
    /// Shutdown order is arbitrary; only the failed child is ever restarted.
    SimpleOneForOne,
}

/// Auto-shutdown policy driven by `significant` children (§4.2 "Auto-shutdown").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoShutdown {
    /// Disabled.
    Never,
    /// Shut down when any significant child terminates without being restarted.
    AnySignificant,
    /// Shut down once every significant child has terminated without being restarted.
    AllSignificant,
}

/// A future resolving to a freshly-started, type-erased child.
pub type ChildFuture = Pin<Box<dyn Future<Output = Result<Box<dyn super::child::Child>, SupervisorError>> + Send>>;

/// Starts one instance of a child, given the supervisor's lifecycle sink to
/// wire into the child's own `ActorEngine::start` call so crashes and
/// terminations flow back to the supervisor. Re-invoked verbatim on every
/// restart — it is the closure-captured equivalent of Erlang's child `start`
/// MFA tuple.
pub type ChildFactory = Arc<dyn Fn(Arc<dyn LifecycleSink>) -> ChildFuture + Send + Sync>;

/// Declarative description of one supervised child (§3 "ChildSpec").
#[derive(Clone)]
pub struct ChildSpec {
    pub id: ChildId,
    pub factory: ChildFactory,
    pub restart: RestartPolicy,
    pub shutdown_timeout: Duration,
    pub significant: bool,
}

impl ChildSpec {
    /// Build a spec. `shutdown_timeout` defaults to 5000ms (§4.1's engine default).
    pub fn new(id: impl Into<String>, restart: RestartPolicy, factory: ChildFactory) -> Self {
        Self {
            id: ChildId::new(id),
            factory,
            restart,
            shutdown_timeout: Duration::from_millis(5000),
            significant: false,
        }
    }

    /// Override the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Mark this child significant for auto-shutdown purposes.
    pub fn significant(mut self) -> Self {
        self.significant = true;
        self
    }
}

impl fmt::Debug for ChildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildSpec")
            .field("id", &self.id)
            .field("restart", &self.restart)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("significant", &self.significant)
            .finish()
    }
}

/// Sliding restart-intensity window (§4.2 "Restart intensity"): a ring
/// buffer of restart timestamps sized `max_restarts`, evicting entries
/// older than `within` on every new restart.
#[derive(Debug, Clone)]
pub struct RestartIntensity {
    max_restarts: u32,
    within: Duration,
    timestamps: VecDeque<DateTime<Utc>>,
}

impl RestartIntensity {
    /// Defaults per §4.2: `maxRestarts=3, withinMs=5000`.
    pub fn new(max_restarts: u32, within: Duration) -> Self {
        Self {
            max_restarts,
            within,
            timestamps: VecDeque::with_capacity(max_restarts as usize),
        }
    }

    /// Record a restart attempt now, evicting stale entries first.
    /// Returns `Err` if the window is now full, per §4.2: the supervisor
    /// itself must fail with `max-restarts-exceeded`.
    pub fn record(&mut self, now: DateTime<Utc>) -> Result<u32, SupervisorError> {
        while let Some(front) = self.timestamps.front() {
            if now.signed_duration_since(*front).to_std().unwrap_or(Duration::ZERO) > self.within {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        if self.timestamps.len() as u32 >= self.max_restarts {
            return Err(SupervisorError::MaxRestartsExceeded {
                max_restarts: self.max_restarts,
                within_ms: self.within.as_millis() as u64,
            });
        }
        self.timestamps.push_back(now);
        Ok(self.timestamps.len() as u32)
    }
}

impl Default for RestartIntensity {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(5000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_policy_decisions() {
        assert!(RestartPolicy::Permanent.should_restart(false));
        assert!(RestartPolicy::Permanent.should_restart(true));
        assert!(!RestartPolicy::Transient.should_restart(false));
        assert!(RestartPolicy::Transient.should_restart(true));
        assert!(!RestartPolicy::Temporary.should_restart(false));
        assert!(!RestartPolicy::Temporary.should_restart(true));
    }

    #[test]
    fn intensity_trips_after_max_restarts_within_window() {
        let mut window = RestartIntensity::new(3, Duration::from_millis(1000));
        let base = Utc::now();
        assert!(window.record(base).is_ok());
        assert!(window.record(base + chrono::Duration::milliseconds(10)).is_ok());
        assert!(window.record(base + chrono::Duration::milliseconds(20)).is_ok());
        let err = window.record(base + chrono::Duration::milliseconds(30)).unwrap_err();
        assert!(matches!(err, SupervisorError::MaxRestartsExceeded { .. }));
    }

    #[test]
    fn intensity_window_slides() {
        let mut window = RestartIntensity::new(2, Duration::from_millis(100));
        let base = Utc::now();
        assert!(window.record(base).is_ok());
        assert!(window.record(base + chrono::Duration::milliseconds(50)).is_ok());
        // Both evicted by the time 200ms have passed.
        assert!(window.record(base + chrono::Duration::milliseconds(250)).is_ok());
    }
}
