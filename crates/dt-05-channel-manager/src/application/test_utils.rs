//! Fixtures for driving a single channel actor in unit tests.

use super::context::ChannelContext;
use crate::adapters::AcceptAllValidator;
use async_trait::async_trait;
use dt_01_voucher_registry::{BincodeCodec, VoucherRegistry};
use dt_02_channel_store::{ChannelStore, InMemoryKVStore};
use dt_03_network::{
    DataTransferNetwork, MemoryHost, MemoryNetwork, MessageReceiver, NetworkConfig,
    NetworkError, StreamNetwork, TransferMessage,
};
use dt_04_transport::{SimulatedTransport, TransportAdapter, TransportConfig, TransportEvents};
use serde::{Deserialize, Serialize};
use shared_bus::InMemoryEventBus;
use shared_types::{
    now_millis, ChannelId, ChannelState, Cid, Direction, PeerId, Selector, TransferId,
    TypedPayload, VoucherType,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BasicVoucher {
    pub data: String,
}

impl VoucherType for BasicVoucher {
    const TYPE: &'static str = "BasicVoucher";
}

struct Recorder(mpsc::UnboundedSender<TransferMessage>);

#[async_trait]
impl MessageReceiver for Recorder {
    async fn receive_message(&self, _from: PeerId, message: TransferMessage) {
        let _ = self.0.send(message);
    }

    async fn receive_error(&self, _from: PeerId, _error: NetworkError) {}
}

/// A "provider" context whose only peer, "client", records every message.
pub(crate) struct Fixture {
    pub ctx: Arc<ChannelContext>,
    pub substrate: Arc<SimulatedTransport>,
    client_inbox: mpsc::UnboundedReceiver<TransferMessage>,
    _client: StreamNetwork<MemoryHost>,
    _transport_events: TransportEvents,
}

impl Fixture {
    pub async fn new() -> Self {
        let net = MemoryNetwork::new();
        let client = StreamNetwork::new(net.host("client"), NetworkConfig::for_testing());
        let (tx, client_inbox) = mpsc::unbounded_channel();
        client.start(Arc::new(Recorder(tx))).await.unwrap();

        let substrate = Arc::new(SimulatedTransport::new());
        let (transport, transport_events) =
            TransportAdapter::new(substrate.clone(), TransportConfig::for_testing());
        let vouchers = VoucherRegistry::new("voucher");
        vouchers
            .register(BasicVoucher::TYPE, BincodeCodec::<BasicVoucher>::new())
            .unwrap();

        let ctx = Arc::new(ChannelContext {
            self_peer: PeerId::new("provider"),
            store: Arc::new(ChannelStore::new(Arc::new(InMemoryKVStore::new()), "test")),
            network: Arc::new(StreamNetwork::new(
                net.host("provider"),
                NetworkConfig::for_testing(),
            )),
            transport: Arc::new(transport),
            validator: Arc::new(AcceptAllValidator),
            vouchers: Arc::new(vouchers),
            voucher_results: Arc::new(VoucherRegistry::new("voucher-result")),
            bus: Arc::new(InMemoryEventBus::new()),
            inbox_warning_threshold: 0,
        });

        Self {
            ctx,
            substrate,
            client_inbox,
            _client: client,
            _transport_events: transport_events,
        }
    }

    /// The client pulling `bafy-root` from us, as first seen here.
    pub fn inbound_pull(&self) -> ChannelState {
        let voucher = TypedPayload::from_typed(&BasicVoucher {
            data: "pull".into(),
        })
        .unwrap();
        ChannelState::new(
            ChannelId::new(PeerId::new("client"), PeerId::new("provider"), TransferId(1)),
            Direction::Pull,
            PeerId::new("provider"),
            Cid::new("bafy-root"),
            Selector::all(),
            voucher,
            now_millis(),
        )
    }

    /// Next message the client received, if one arrives shortly.
    pub async fn client_received(&mut self) -> Option<TransferMessage> {
        timeout(Duration::from_millis(200), self.client_inbox.recv())
            .await
            .ok()
            .flatten()
    }
}
