//! # Inbound Ports (Driving Ports)
//!
//! Channel operations offered to applications.

use crate::domain::DataTransferResult;
use async_trait::async_trait;
use shared_types::{ChannelId, ChannelState, Cid, PeerId, Selector, Voucher};

#[async_trait]
pub trait DataTransferApi: Send + Sync {
    /// Offer data to `peer`. Returns once the Open message is sent.
    async fn open_push(
        &self,
        peer: &PeerId,
        voucher: Voucher,
        base_cid: Cid,
        selector: Selector,
    ) -> DataTransferResult<ChannelId>;

    /// Request data from `peer`. Returns once the Open message is sent.
    async fn open_pull(
        &self,
        peer: &PeerId,
        voucher: Voucher,
        base_cid: Cid,
        selector: Selector,
    ) -> DataTransferResult<ChannelId>;

    /// Attach a further voucher to a channel we opened.
    async fn send_voucher(&self, channel_id: &ChannelId, voucher: Voucher)
        -> DataTransferResult<()>;

    /// Cancel. A channel that already ended is left as it is.
    async fn cancel(&self, channel_id: &ChannelId) -> DataTransferResult<()>;

    /// Restart a failed, paused or stalled channel from its persisted progress.
    async fn restart(&self, channel_id: &ChannelId) -> DataTransferResult<()>;

    async fn pause(&self, channel_id: &ChannelId) -> DataTransferResult<()>;

    async fn resume(&self, channel_id: &ChannelId) -> DataTransferResult<()>;

    /// Current snapshot of one channel.
    async fn get_channel(&self, channel_id: &ChannelId) -> DataTransferResult<ChannelState>;

    /// Channels with a live actor that have not ended.
    async fn in_progress_channels(&self) -> DataTransferResult<Vec<ChannelState>>;

    /// Every persisted channel.
    async fn list_channels(&self) -> DataTransferResult<Vec<ChannelState>>;
}
