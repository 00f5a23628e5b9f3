//! Stock validators.

use crate::ports::outbound::RequestValidator;
use async_trait::async_trait;
use shared_types::{
    ChannelId, ChannelState, Cid, PeerId, Selector, ValidationError, ValidationResult, Voucher,
};
use tracing::debug;

/// Accepts every request. Demo nodes and tests only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

#[async_trait]
impl RequestValidator for AcceptAllValidator {
    async fn validate_push(
        &self,
        channel_id: &ChannelId,
        sender: &PeerId,
        _voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        debug!(channel_id = %channel_id, peer = %sender, "Accepting push");
        Ok(ValidationResult::accept())
    }

    async fn validate_pull(
        &self,
        channel_id: &ChannelId,
        receiver: &PeerId,
        _voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        debug!(channel_id = %channel_id, peer = %receiver, "Accepting pull");
        Ok(ValidationResult::accept())
    }

    async fn validate_restart(
        &self,
        _channel_id: &ChannelId,
        _state: &ChannelState,
    ) -> Result<ValidationResult, ValidationError> {
        Ok(ValidationResult::accept())
    }
}
