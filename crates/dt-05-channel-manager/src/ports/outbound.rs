//! # Outbound Ports (Driven Ports)
//!
//! The application's authorization policy. Exactly one validator is bound
//! to a manager, at construction.

use async_trait::async_trait;
use shared_types::{
    ChannelId, ChannelState, Cid, PeerId, Selector, ValidationError, ValidationResult, Voucher,
};

/// Decides whether a peer may open, continue or restart a channel.
///
/// Calls run inside the channel's own actor: a slow validator holds up that
/// channel only.
#[async_trait]
pub trait RequestValidator: Send + Sync + 'static {
    /// `sender` wants to push `base_cid`/`selector` to us.
    ///
    /// Also called again for every new voucher on an established push
    /// channel.
    async fn validate_push(
        &self,
        channel_id: &ChannelId,
        sender: &PeerId,
        voucher: &Voucher,
        base_cid: &Cid,
        selector: &Selector,
    ) -> Result<ValidationResult, ValidationError>;

    /// `receiver` wants to pull `base_cid`/`selector` from us.
    ///
    /// Also called again for every new voucher on an established pull
    /// channel.
    async fn validate_pull(
        &self,
        channel_id: &ChannelId,
        receiver: &PeerId,
        voucher: &Voucher,
        base_cid: &Cid,
        selector: &Selector,
    ) -> Result<ValidationResult, ValidationError>;

    /// A channel is being restarted with its persisted state.
    async fn validate_restart(
        &self,
        channel_id: &ChannelId,
        state: &ChannelState,
    ) -> Result<ValidationResult, ValidationError>;
}
