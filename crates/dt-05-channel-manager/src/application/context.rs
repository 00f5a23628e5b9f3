//! Collaborators shared by every channel actor of one manager.

use crate::ports::outbound::RequestValidator;
use dt_01_voucher_registry::{RegistryError, VoucherRegistry};
use dt_02_channel_store::ChannelStateStore;
use dt_03_network::DataTransferNetwork;
use dt_04_transport::ChannelTransport;
use shared_bus::InMemoryEventBus;
use shared_types::{PeerId, TypedPayload, Voucher, VoucherResult};
use std::sync::Arc;
use tracing::warn;

pub(crate) struct ChannelContext {
    pub self_peer: PeerId,
    pub store: Arc<dyn ChannelStateStore>,
    pub network: Arc<dyn DataTransferNetwork>,
    pub transport: Arc<dyn ChannelTransport>,
    pub validator: Arc<dyn RequestValidator>,
    pub vouchers: Arc<VoucherRegistry>,
    pub voucher_results: Arc<VoucherRegistry>,
    pub bus: Arc<InMemoryEventBus>,
    pub inbox_warning_threshold: usize,
}

impl ChannelContext {
    /// Wire form of a voucher.
    pub fn encode_voucher(&self, voucher: &Voucher) -> Result<TypedPayload, RegistryError> {
        Ok(TypedPayload {
            type_id: voucher.type_id.clone(),
            data: self.vouchers.encode(voucher)?,
        })
    }

    pub fn decode_voucher(&self, wire: &TypedPayload) -> Result<Voucher, RegistryError> {
        self.vouchers.decode(&wire.type_id, &wire.data)
    }

    /// Wire form of a voucher result. A result type the registry does not
    /// know is kept locally and left off the wire.
    pub fn encode_result(&self, result: Option<&VoucherResult>) -> Option<TypedPayload> {
        let result = result?;
        match self.voucher_results.encode(result) {
            Ok(data) => Some(TypedPayload {
                type_id: result.type_id.clone(),
                data,
            }),
            Err(e) => {
                warn!(type_id = %result.type_id, error = %e, "Voucher result not sent");
                None
            }
        }
    }

    /// Decoded voucher result, or `None` (logged) if it cannot be read.
    pub fn decode_result(&self, wire: Option<TypedPayload>) -> Option<VoucherResult> {
        let wire = wire?;
        match self.voucher_results.decode(&wire.type_id, &wire.data) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(type_id = %wire.type_id, error = %e, "Dropping unreadable voucher result");
                None
            }
        }
    }
}
