//! [`MessageEnvelope`]: the signed wire envelope (§3 "Envelope (wire)", §4.4).

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_cbor::Value as CborValue;
use sha2::Sha256;

use wardenrt::util::NodeId;

use super::message::WireMessage;
use crate::error::TransportError;

type HmacSha256 = Hmac<Sha256>;

/// The protocol version this implementation speaks. §3: `version=1`.
pub const ENVELOPE_VERSION: u8 = 1;

/// One signed (or, with no configured secret, unsigned) frame (§3, §4.4).
///
/// Canonical form for signing is built separately from the envelope's own
/// CBOR encoding (see [`MessageEnvelope::canonical_signing_bytes`]): fields
/// are assembled into a `BTreeMap<String, serde_cbor::Value>` — a fixed,
/// sorted key order — before CBOR-encoding that map, so two implementations
/// that agree on field values always agree on the signed byte sequence
/// regardless of struct layout changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub version: u8,
    pub from: NodeId,
    pub timestamp_ms: i64,
    /// Hex-encoded HMAC-SHA256, present only when the sending node is
    /// configured with a cluster secret (§4.4 "Authentication").
    pub signature: Option<String>,
    pub payload: WireMessage,
}

impl MessageEnvelope {
    /// Build an unsigned envelope. Call [`Self::sign`] afterward if the
    /// local node has a cluster secret configured.
    pub fn new(from: NodeId, timestamp_ms: i64, payload: WireMessage) -> Self {
        Self { version: ENVELOPE_VERSION, from, timestamp_ms, signature: None, payload }
    }

    /// Canonical bytes over `version`, `from`, `timestamp_ms`, and the
    /// payload (CBOR-encoded once to get a stable byte string, then wrapped
    /// so the outer map has a fixed key order) — the HMAC input (§4.4).
    pub fn canonical_signing_bytes(&self) -> Result<Vec<u8>, TransportError> {
        let payload_bytes =
            serde_cbor::to_vec(&self.payload).map_err(|err| TransportError::Codec(err.to_string()))?;

        let mut canonical: BTreeMap<String, CborValue> = BTreeMap::new();
        canonical.insert("version".to_string(), CborValue::Integer(self.version as i128));
        canonical.insert("from".to_string(), CborValue::Text(self.from.as_str().to_string()));
        canonical.insert("timestamp".to_string(), CborValue::Integer(self.timestamp_ms as i128));
        canonical.insert("payload".to_string(), CborValue::Bytes(payload_bytes));

        serde_cbor::to_vec(&canonical).map_err(|err| TransportError::Codec(err.to_string()))
    }

    /// Sign this envelope with `secret`, setting `signature`.
    pub fn sign(&mut self, secret: &str) -> Result<(), TransportError> {
        let bytes = self.canonical_signing_bytes()?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| TransportError::Codec(err.to_string()))?;
        mac.update(&bytes);
        self.signature = Some(hex_encode(&mac.finalize().into_bytes()));
        Ok(())
    }

    /// Verify `signature` against `secret`. `Ok(())` if no secret is
    /// configured locally (signing is then optional) and no signature is
    /// present; otherwise requires both to be present and to match.
    pub fn verify(&self, secret: Option<&str>) -> Result<(), TransportError> {
        match (secret, &self.signature) {
            (None, _) => Ok(()),
            (Some(_), None) => Err(TransportError::SignatureInvalid),
            (Some(secret), Some(sig)) => {
                let bytes = self.canonical_signing_bytes()?;
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .map_err(|err| TransportError::Codec(err.to_string()))?;
                mac.update(&bytes);
                let expected = hex_encode(&mac.finalize().into_bytes());
                if constant_time_eq(expected.as_bytes(), sig.as_bytes()) {
                    Ok(())
                } else {
                    Err(TransportError::SignatureInvalid)
                }
            }
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Avoids short-circuiting on the first mismatched byte, so signature
/// verification doesn't leak timing information about where two hex
/// strings first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
