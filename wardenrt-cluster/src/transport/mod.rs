//! Framed TCP transport (§4.4): one persistent connection per peer node,
//! owned by whichever side the lower-`NodeId`-string tie-break says should
//! initiate, with exponential-backoff reconnect.

pub mod connection;
pub mod listener;

pub use connection::{handshake, should_initiate, spawn_pump, ConnectionHandle, Inbound, ReconnectBackoff};
