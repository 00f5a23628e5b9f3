//! # Inbound Ports (Driving Ports)
//!
//! Per-channel transport commands issued by channel actors.

use crate::domain::errors::TransportError;
use crate::domain::types::TransferRequest;
use async_trait::async_trait;
use shared_types::ChannelId;

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Start (or restart) moving data for a channel.
    async fn start(&self, request: TransferRequest) -> Result<(), TransportError>;

    /// Pause. A channel without a running transfer is left alone.
    async fn pause(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    /// Resume. A channel without a running transfer is left alone.
    async fn resume(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    /// Abort; later substrate reports for the channel are dropped.
    async fn cancel(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    fn supports_resume(&self) -> bool;

    fn is_active(&self, channel_id: &ChannelId) -> bool;
}
