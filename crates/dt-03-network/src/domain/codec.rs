//! # Wire Codec
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────────────┐
//! │ length (u32, BE) │ bincode(WireEnvelope { version, msg })  │
//! └──────────────────┴─────────────────────────────────────────┘
//! ```
//!
//! Framing is `tokio_util`'s `LengthDelimitedCodec`; the codec refuses
//! frames above the configured limit on both encode and decode.

use super::errors::NetworkError;
use super::message::TransferMessage;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Current wire version.
pub const WIRE_VERSION: u16 = 1;

/// Default maximum frame payload (4 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Versioned wrapper around a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub version: u16,
    pub message: TransferMessage,
}

/// Encoder/decoder for [`TransferMessage`] frames.
pub struct MessageCodec {
    framing: LengthDelimitedCodec,
    max_frame_size: usize,
}

impl MessageCodec {
    /// Create a codec accepting frames up to `max_frame_size` bytes.
    pub fn new(max_frame_size: usize) -> Self {
        let framing = LengthDelimitedCodec::builder()
            .length_field_length(4)
            .max_frame_length(max_frame_size)
            .new_codec();
        Self {
            framing,
            max_frame_size,
        }
    }

    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

/// Serialize one message into a frame payload (no length prefix).
pub fn encode_message(message: &TransferMessage) -> Result<Vec<u8>, NetworkError> {
    let envelope = WireEnvelope {
        version: WIRE_VERSION,
        message: message.clone(),
    };
    bincode::serialize(&envelope).map_err(|e| NetworkError::Encode(e.to_string()))
}

/// Parse a frame payload (no length prefix).
pub fn decode_message(payload: &[u8]) -> Result<TransferMessage, NetworkError> {
    let envelope: WireEnvelope =
        bincode::deserialize(payload).map_err(|e| NetworkError::Decode(e.to_string()))?;
    if envelope.version != WIRE_VERSION {
        return Err(NetworkError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope.message)
}

impl Encoder<TransferMessage> for MessageCodec {
    type Error = NetworkError;

    fn encode(&mut self, item: TransferMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = encode_message(&item)?;
        if payload.len() > self.max_frame_size {
            return Err(NetworkError::FrameTooLarge {
                size: payload.len(),
                limit: self.max_frame_size,
            });
        }
        self.framing.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}

impl Decoder for MessageCodec {
    type Item = TransferMessage;
    type Error = NetworkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = match self.framing.decode(src) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => return Err(NetworkError::Decode(e.to_string())),
        };
        decode_message(&frame).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(NetworkError::Decode(format!(
                "stream ended inside a frame ({} bytes buffered)",
                buf.len()
            ))),
        }
    }
}
