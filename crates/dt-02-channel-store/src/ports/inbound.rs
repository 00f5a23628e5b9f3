//! # Inbound Ports (Driving Ports)
//!
//! The API the channel manager drives.

use crate::domain::errors::StoreError;
use shared_types::{ChannelId, ChannelState, ChannelStatus, PeerId, TransferId};

/// Durable channel state, one record per `ChannelId`.
pub trait ChannelStateStore: Send + Sync {
    /// Insert or overwrite the record for `state.channel_id`.
    fn put(&self, state: &ChannelState) -> Result<(), StoreError>;

    /// Load one channel. `NotFound` if it was never stored.
    fn get(&self, id: &ChannelId) -> Result<ChannelState, StoreError>;

    /// Every stored channel currently in `status`.
    fn list_by_status(&self, status: ChannelStatus) -> Result<Vec<ChannelState>, StoreError>;

    /// Every stored channel.
    fn list_all(&self) -> Result<Vec<ChannelState>, StoreError>;

    /// Every stored channel that is not in a terminal status.
    fn list_non_terminal(&self) -> Result<Vec<ChannelState>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|state| !state.status.is_terminal())
            .collect())
    }

    /// Highest transfer id stored for channels opened by `initiator`.
    fn highest_transfer_id(&self, initiator: &PeerId) -> Result<Option<TransferId>, StoreError>;
}
