//! Transport errors.

use shared_types::ChannelId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no active transfer for channel {0}")]
    UnknownChannel(ChannelId),

    #[error("transfer already running for channel {0}")]
    AlreadyActive(ChannelId),

    /// The substrate refused a command.
    #[error("substrate error: {0}")]
    Substrate(String),

    #[error("transport adapter shut down")]
    Closed,
}
