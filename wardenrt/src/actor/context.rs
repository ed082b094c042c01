//! Per-actor context handed to every behavior callback.

use chrono::{DateTime, Utc};

use crate::util::ActorAddress;

/// Identity and timing metadata available inside `init`/`handle_call`/
/// `handle_cast`/`terminate`. Constructed once per actor and reused for
/// every callback invocation across its lifetime.
///
/// Calling a *different* actor from within a handler is done the same way
/// any other caller would: hold a clone of that actor's
/// [`crate::engine::ActorEngine`] (as a field on `self`, exactly like a pid
/// stored in process state) and call `.call()`/`.cast()` on it directly.
/// `ActorContext` itself stays free of a generic broker parameter so a
/// supervisor's ordered child list can hold actors of unrelated `Behavior`
/// types side by side (see `supervisor::ChildSpec`).
pub struct ActorContext {
    handle: ActorAddress,
    started_at: DateTime<Utc>,
}

impl ActorContext {
    pub(crate) fn new(handle: ActorAddress) -> Self {
        Self {
            handle,
            started_at: Utc::now(),
        }
    }

    /// This actor's own handle.
    pub fn handle(&self) -> &ActorAddress {
        &self.handle
    }

    /// When the engine began running this actor's `init`.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
