//! [`EnvelopeCodec`]: length-prefixed framing plus CBOR encode/decode of
//! [`MessageEnvelope`] (§4.4 "Framing").
//!
//! Wraps `tokio_util::codec::LengthDelimitedCodec` configured for a 4-byte
//! big-endian length field and a 16 MiB maximum frame — `uint32be length`
//! then `length` bytes of payload, exactly as §4.4 and §6 specify.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use super::envelope::MessageEnvelope;
use crate::error::TransportError;

/// 16 MiB, the max payload §4.4 allows before the connection is closed.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Encodes/decodes [`MessageEnvelope`] values over a length-delimited,
/// big-endian-u32-prefixed stream.
pub struct EnvelopeCodec {
    inner: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        let inner = LengthDelimitedCodec::builder()
            .length_field_type::<u32>()
            .big_endian()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        Self { inner }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder<MessageEnvelope> for EnvelopeCodec {
    type Error = TransportError;

    fn encode(&mut self, item: MessageEnvelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = serde_cbor::to_vec(&item).map_err(|err| TransportError::Codec(err.to_string()))?;
        if bytes.len() > MAX_FRAME_LEN {
            return Err(TransportError::FrameTooLarge(bytes.len()));
        }
        self.inner
            .encode(Bytes::from(bytes), dst)
            .map_err(|err| TransportError::Io(err.to_string()))
    }
}

impl Decoder for EnvelopeCodec {
    type Item = MessageEnvelope;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.inner.decode(src).map_err(|err| TransportError::Io(err.to_string()))? else {
            return Ok(None);
        };
        let envelope: MessageEnvelope =
            serde_cbor::from_slice(&frame).map_err(|err| TransportError::Codec(err.to_string()))?;
        Ok(Some(envelope))
    }
}
