//! # Store Errors

use shared_types::ChannelId;
use thiserror::Error;

/// Errors from the raw key-value layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// The backend reported corruption.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Errors from the channel state store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("channel not found: {0}")]
    NotFound(ChannelId),

    /// Checksum mismatch, truncated record or undecodable payload.
    #[error("corrupt channel record at {key}: {reason}")]
    DataCorruption { key: String, reason: String },

    #[error("unsupported channel record version {0}")]
    UnsupportedVersion(u8),

    #[error("failed to serialize channel state: {0}")]
    Serialization(String),

    #[error(transparent)]
    Backend(#[from] KVStoreError),
}
