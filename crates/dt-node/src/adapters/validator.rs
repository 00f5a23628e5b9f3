//! Demo voucher and the validator that checks it.

use async_trait::async_trait;
use dt_05_channel_manager::RequestValidator;
use serde::{Deserialize, Serialize};
use shared_types::{
    ChannelId, ChannelState, Cid, PeerId, Selector, ValidationError, ValidationResult, Voucher,
    VoucherType,
};
use tracing::{debug, info};

/// Voucher carried by demo requests: a shared token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoVoucher {
    pub token: String,
}

impl VoucherType for DemoVoucher {
    const TYPE: &'static str = "dt-node/demo-voucher";
}

/// Accepts requests whose [`DemoVoucher`] carries the expected token.
/// With no token configured every well-formed voucher passes.
#[derive(Debug, Clone, Default)]
pub struct TokenValidator {
    token: Option<String>,
    data_limit: Option<u64>,
}

impl TokenValidator {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            data_limit: None,
        }
    }

    /// Grant at most `limit` bytes per voucher.
    #[must_use]
    pub fn with_data_limit(mut self, limit: u64) -> Self {
        self.data_limit = Some(limit);
        self
    }

    fn check(
        &self,
        channel_id: &ChannelId,
        peer: &PeerId,
        voucher: &Voucher,
    ) -> Result<ValidationResult, ValidationError> {
        let demo: DemoVoucher = voucher.decode_as()?;
        if let Some(expected) = &self.token {
            if &demo.token != expected {
                info!(channel_id = %channel_id, peer = %peer, "Rejecting request with wrong token");
                return Ok(ValidationResult::reject());
            }
        }
        debug!(channel_id = %channel_id, peer = %peer, "Voucher accepted");
        let result = ValidationResult::accept();
        Ok(match self.data_limit {
            Some(limit) => result.with_data_limit(limit),
            None => result,
        })
    }
}

#[async_trait]
impl RequestValidator for TokenValidator {
    async fn validate_push(
        &self,
        channel_id: &ChannelId,
        sender: &PeerId,
        voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        self.check(channel_id, sender, voucher)
    }

    async fn validate_pull(
        &self,
        channel_id: &ChannelId,
        receiver: &PeerId,
        voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        self.check(channel_id, receiver, voucher)
    }

    async fn validate_restart(
        &self,
        channel_id: &ChannelId,
        state: &ChannelState,
    ) -> Result<ValidationResult, ValidationError> {
        let voucher = state.last_voucher().ok_or_else(|| {
            ValidationError::InvalidVoucher("channel has no voucher".to_string())
        })?;
        self.check(channel_id, &state.other_peer, voucher)
    }
}
