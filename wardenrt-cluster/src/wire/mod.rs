//! The wire protocol (§4.4, §6): framing, the canonical envelope, and the
//! typed-union message kinds that cross a cluster connection.
//!
//! Serialization commits to CBOR via `serde_cbor` (§4.4's open question on
//! format), framed with `tokio_util::codec::LengthDelimitedCodec` configured
//! for a 4-byte big-endian length prefix and a 16 MiB maximum frame,
//! matching §4.4 exactly.

pub mod codec;
pub mod envelope;
pub mod message;
pub mod value;

pub use codec::EnvelopeCodec;
pub use envelope::MessageEnvelope;
pub use message::{CallErrorKind, WireMessage};
pub use value::WireValue;
