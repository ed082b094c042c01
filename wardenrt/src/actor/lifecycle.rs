//! Actor lifecycle state machine.
//!
//! `initializing -> running -> stopping -> stopped` per the data model;
//! `stopped` is terminal for both a clean stop and a crash (crash carries
//! its reason on the `Crashed` lifecycle event instead of a distinct state).

use chrono::{DateTime, Utc};

/// Position of an actor in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    /// `init` is running; no messages are accepted yet.
    Initializing,
    /// `init` succeeded; the worker is pulling its mailbox.
    Running,
    /// A stop was requested; `terminate` is running or pending force-kill.
    Stopping,
    /// Terminal. Reached via normal stop, supervisor shutdown, or crash.
    Stopped,
}

impl Default for ActorState {
    fn default() -> Self {
        Self::Initializing
    }
}

impl ActorState {
    /// `true` for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Tracks the current state and last transition time for one actor.
#[derive(Debug, Clone)]
pub struct ActorLifecycle {
    state: ActorState,
    last_transition: DateTime<Utc>,
}

impl ActorLifecycle {
    /// A freshly-created lifecycle, starting in `Initializing`.
    pub fn new() -> Self {
        Self {
            state: ActorState::Initializing,
            last_transition: Utc::now(),
        }
    }

    /// Move to `new_state`, recording the transition time.
    pub fn transition_to(&mut self, new_state: ActorState) {
        self.state = new_state;
        self.last_transition = Utc::now();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActorState {
        self.state
    }

    /// Timestamp of the most recent transition.
    pub fn last_transition(&self) -> DateTime<Utc> {
        self.last_transition
    }
}

impl Default for ActorLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
