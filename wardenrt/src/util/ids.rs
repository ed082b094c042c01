// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Layer 3: Internal module imports
// (none)

/// Unique identifier for actors in the system
///
/// # Performance
/// Uses UUID v4 for globally unique identifiers with excellent collision resistance.
/// Implements cheap cloning via Copy trait.
///
/// # Example
/// ```rust
/// use wardenrt::util::ActorId;
///
/// let id1 = ActorId::new();
/// let id2 = ActorId::new();
/// assert_ne!(id1, id2); // Globally unique
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Generate a new random ActorId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create ActorId from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for messages in the system
///
/// # Example
/// ```rust
/// use wardenrt::util::MessageId;
///
/// let id = MessageId::new();
/// println!("Message ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a new random MessageId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create MessageId from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a cluster node, `name@host:port`.
///
/// `name` must match `[A-Za-z][A-Za-z0-9_-]{0,63}` and `port` must be in
/// `[1, 65535]`; both are enforced by [`NodeId::parse`]. Equality and
/// ordering are by the formatted string, which is what makes the
/// lexicographically-smaller-wins tie-breaks elsewhere in the system
/// (connection ownership, global registry conflict resolution) well
/// defined.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Construct a `NodeId` from its parts without validating `name`'s charset.
    ///
    /// Prefer [`NodeId::parse`] when the name comes from untrusted input.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self(format!("{}@{}:{}", name.into(), host.into(), port))
    }

    /// Parse and validate a `name@host:port` string.
    pub fn parse(raw: &str) -> Result<Self, NodeIdError> {
        let (name, rest) = raw.split_once('@').ok_or(NodeIdError::MissingAt)?;
        let (host, port) = rest.rsplit_once(':').ok_or(NodeIdError::MissingPort)?;

        if name.is_empty() || name.len() > 64 {
            return Err(NodeIdError::InvalidName);
        }
        let mut chars = name.chars();
        let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !first_ok || !rest_ok {
            return Err(NodeIdError::InvalidName);
        }
        if host.is_empty() {
            return Err(NodeIdError::InvalidHost);
        }
        let port: u16 = port.parse().map_err(|_| NodeIdError::InvalidPort)?;
        if port == 0 {
            return Err(NodeIdError::InvalidPort);
        }

        Ok(Self(raw.to_string()))
    }

    /// The full `name@host:port` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `host` segment, e.g. `10.0.0.1` out of `node1@10.0.0.1:9000`.
    pub fn host(&self) -> &str {
        let rest = self.0.split_once('@').map(|(_, rest)| rest).unwrap_or(&self.0);
        rest.rsplit_once(':').map(|(host, _)| host).unwrap_or(rest)
    }

    /// The `port` segment, e.g. `9000` out of `node1@10.0.0.1:9000`.
    pub fn port(&self) -> u16 {
        self.0.rsplit_once(':').and_then(|(_, port)| port.parse().ok()).unwrap_or(0)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from [`NodeId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeIdError {
    #[error("node id missing '@' separator")]
    MissingAt,
    #[error("node id missing ':port' suffix")]
    MissingPort,
    #[error("node name must match [A-Za-z][A-Za-z0-9_-]{{0,63}}")]
    InvalidName,
    #[error("node host must not be empty")]
    InvalidHost,
    #[error("node port must be in [1, 65535]")]
    InvalidPort,
}

/// Actor address for message routing.
///
/// Doubles as the wire-level `ActorHandle`: an address with `node_id: None`
/// is local; one with `Some(node_id)` refers to an actor owned by that
/// node and is only routable while that node is connected. Equality is by
/// `(node_id, id)` as the data model requires — two addresses with the same
/// `id` but different `node_id` are distinct handles.
///
/// # Design
/// Supports both named and anonymous actors for flexible routing patterns.
/// Named actors can be discovered by name, while anonymous actors are
/// accessible only via their unique ID.
///
/// # Example
/// ```rust
/// use wardenrt::util::ActorAddress;
///
/// // Create named actor
/// let supervisor = ActorAddress::named("main_supervisor");
/// assert_eq!(supervisor.name(), Some("main_supervisor"));
///
/// // Create anonymous actor
/// let worker = ActorAddress::anonymous();
/// assert_eq!(worker.name(), None);
/// assert!(worker.is_local());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorAddress {
    /// Named actor with string identifier
    Named {
        id: ActorId,
        name: String,
        node_id: Option<NodeId>,
    },
    /// Anonymous actor with only ID
    Anonymous { id: ActorId, node_id: Option<NodeId> },
}

impl ActorAddress {
    /// Create a new named, local actor address
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            id: ActorId::new(),
            name: name.into(),
            node_id: None,
        }
    }

    /// Create a new anonymous, local actor address
    pub fn anonymous() -> Self {
        Self::Anonymous {
            id: ActorId::new(),
            node_id: None,
        }
    }

    /// Re-address `self` as owned by `node_id`, for use on the wire or in a
    /// remote registry.
    pub fn with_node(mut self, node_id: NodeId) -> Self {
        match &mut self {
            Self::Named { node_id: n, .. } | Self::Anonymous { node_id: n, .. } => {
                *n = Some(node_id);
            }
        }
        self
    }

    /// Get the actor ID
    pub fn id(&self) -> &ActorId {
        match self {
            Self::Named { id, .. } => id,
            Self::Anonymous { id } => id,
        }
    }

    /// Get the actor name if available
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Anonymous { .. } => None,
        }
    }

    /// The owning node, or `None` if this address is local to the current engine.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::Named { node_id, .. } | Self::Anonymous { node_id, .. } => node_id.as_ref(),
        }
    }

    /// An unknown (never-seen) `node_id` means this handle is not routable;
    /// a local address (`node_id: None`) is always considered local, never unroutable.
    pub fn is_local(&self) -> bool {
        self.node_id().is_none()
    }
}

impl Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, name, node_id } => match node_id {
                Some(n) => write!(f, "{name}@{id}#{n}"),
                None => write!(f, "{name}@{id}"),
            },
            Self::Anonymous { id, node_id } => match node_id {
                Some(n) => write!(f, "anonymous@{id}#{n}"),
                None => write!(f, "anonymous@{id}"),
            },
        }
    }
}
