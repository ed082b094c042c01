//! [`WireValue`]: the typed-union scalar model §4.4 requires the target
//! commit to instead of an opaque "any" payload (§9 "Opaque any payloads on
//! the wire"). Used for membership metadata and anywhere a genuinely
//! dynamic value needs to cross the wire; actor message bodies themselves
//! travel as already-CBOR-encoded bytes produced by the sender's own
//! `Message` type (see `crate::remote::directory`), since those are
//! strongly typed on both ends and don't need this dynamic representation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every scalar/compound type §4.4 lists as crossing the wire. Functions,
/// opaque instances, cycles and weak references have no variant here —
/// attempting to build one from such a value is a caller-side
/// `TransportError::Serialization` before a `WireValue` ever exists.
///
/// Out-of-range integers (outside `i64`/`u64`) are represented as
/// `BigNumber`, a decimal string with a type tag, rather than silently
/// truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// Out-of-range integer, carried as its decimal string representation.
    BigNumber(String),
    /// Covers `±infinity` and `NaN`: both round-trip through CBOR's IEEE754
    /// float encoding, unlike JSON which has no literal for either.
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// ISO-8601 timestamp, type-tagged by virtue of being its own variant
    /// rather than an ambiguous string.
    Timestamp(DateTime<Utc>),
    Array(Vec<WireValue>),
    /// String-keyed mapping. `BTreeMap` rather than `HashMap` so the same
    /// logical map always serializes to the same byte sequence — required
    /// for the envelope's HMAC signature to be reproducible (§4.4
    /// "Canonical form").
    Map(BTreeMap<String, WireValue>),
}

impl WireValue {
    /// Build a `Map` from an iterator of key/value pairs.
    pub fn map(entries: impl IntoIterator<Item = (String, WireValue)>) -> Self {
        Self::Map(entries.into_iter().collect())
    }
}

impl From<bool> for WireValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for WireValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for WireValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for WireValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for WireValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for WireValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for WireValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_cbor() {
        let value = WireValue::map([
            ("n".to_string(), WireValue::Null),
            ("b".to_string(), WireValue::Bool(true)),
            ("i".to_string(), WireValue::Int(-7)),
            ("f".to_string(), WireValue::Float(f64::NAN)),
            ("s".to_string(), WireValue::Text("hi".into())),
            ("arr".to_string(), WireValue::Array(vec![WireValue::UInt(1), WireValue::UInt(2)])),
        ]);
        let bytes = serde_cbor::to_vec(&value).expect("encode");
        let back: WireValue = serde_cbor::from_slice(&bytes).expect("decode");
        match back {
            WireValue::Map(m) => {
                assert!(matches!(m.get("n"), Some(WireValue::Null)));
                assert!(matches!(m.get("b"), Some(WireValue::Bool(true))));
                match m.get("f") {
                    Some(WireValue::Float(f)) => assert!(f.is_nan()),
                    other => panic!("unexpected: {other:?}"),
                }
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn infinity_roundtrips() {
        let bytes = serde_cbor::to_vec(&WireValue::Float(f64::INFINITY)).expect("encode");
        let back: WireValue = serde_cbor::from_slice(&bytes).expect("decode");
        assert!(matches!(back, WireValue::Float(f) if f.is_infinite() && f > 0.0));
    }

    #[test]
    fn big_number_carries_out_of_range_integer_as_string() {
        let value = WireValue::BigNumber("99999999999999999999999999".to_string());
        let bytes = serde_cbor::to_vec(&value).expect("encode");
        let back: WireValue = serde_cbor::from_slice(&bytes).expect("decode");
        assert_eq!(back, value);
    }
}
