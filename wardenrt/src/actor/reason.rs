//! Termination reasons shared by the engine, registry and supervisor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an actor reached the terminal `stopped` state.
///
/// `Normal` and `Shutdown` are set by the engine itself (default stop reason
/// and supervisor-initiated shutdown respectively); `Stopped` carries a
/// caller-supplied reason string from an explicit `stop(handle, reason)`
/// call; `Crashed` is set when `init`, `handle_call` or `handle_cast`
/// returned an error; `Abnormal` is for non-engine-local abnormal exits
/// (the distributed supervisor uses it to report node-down as a restart
/// trigger without inventing a second taxonomy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Default reason for an unremarkable stop.
    Normal,
    /// Supervisor-initiated shutdown (cascading restart, tree shutdown).
    Shutdown,
    /// Caller-supplied reason from an explicit `stop` call.
    Stopped(String),
    /// A behavior callback returned an error.
    Crashed(String),
    /// Abnormal termination reported by something other than the engine
    /// itself (e.g. the distributed supervisor's node-down failover).
    Abnormal(String),
}

impl TerminationReason {
    /// `transient` children restart only on an abnormal reason; `normal`,
    /// `shutdown`, and explicit `stop` are final per §4.2.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Crashed(_) | Self::Abnormal(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Stopped(reason) => write!(f, "{reason}"),
            Self::Crashed(err) => write!(f, "crashed: {err}"),
            Self::Abnormal(why) => write!(f, "abnormal: {why}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_and_shutdown_are_not_abnormal() {
        assert!(!TerminationReason::Normal.is_abnormal());
        assert!(!TerminationReason::Shutdown.is_abnormal());
        assert!(!TerminationReason::Stopped("done".into()).is_abnormal());
    }

    #[test]
    fn crashed_and_abnormal_are_abnormal() {
        assert!(TerminationReason::Crashed("boom".into()).is_abnormal());
        assert!(TerminationReason::Abnormal("node_down".into()).is_abnormal());
    }
}
