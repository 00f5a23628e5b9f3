//! Network errors.

use shared_types::PeerId;
use std::io;
use thiserror::Error;

/// Errors raised by the network message layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Bytes on a stream could not be turned into a message.
    #[error("malformed frame: {0}")]
    Decode(String),

    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u16),

    #[error("peer {0} is unreachable")]
    PeerUnreachable(PeerId),

    #[error("failed to send to {peer} after {attempts} attempts: {reason}")]
    SendFailed {
        peer: PeerId,
        attempts: u32,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("network not started")]
    NotStarted,

    #[error("network closed")]
    Closed,
}

impl NetworkError {
    /// Whether retrying the same send could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::Io(_) | NetworkError::PeerUnreachable(_) | NetworkError::Closed
        )
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        NetworkError::Io(err.to_string())
    }
}
