//! Manager error type, aggregating the subsystem errors.

use dt_01_voucher_registry::RegistryError;
use dt_02_channel_store::StoreError;
use dt_03_network::NetworkError;
use dt_04_transport::TransportError;
use shared_types::{ChannelId, ChannelStatus, ValidationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataTransferError {
    /// The validator refused the request or failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed or out-of-order protocol message.
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Persistence failed; the transition did not happen.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("channel not found: {0}")]
    NotFound(ChannelId),

    /// The manager is not started, or is shutting down.
    #[error("data transfer manager is not running")]
    NotRunning,

    #[error("cannot {operation} channel {channel_id} in status {status}")]
    InvalidState {
        channel_id: ChannelId,
        status: ChannelStatus,
        operation: String,
    },
}

impl DataTransferError {
    pub(crate) fn invalid_state(
        channel_id: &ChannelId,
        status: ChannelStatus,
        operation: impl Into<String>,
    ) -> Self {
        DataTransferError::InvalidState {
            channel_id: channel_id.clone(),
            status,
            operation: operation.into(),
        }
    }

    /// Store failures abort the transition that hit them.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, DataTransferError::Store(_))
    }
}

pub type DataTransferResult<T> = Result<T, DataTransferError>;
