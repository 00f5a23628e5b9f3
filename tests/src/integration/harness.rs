//! # Test Harness
//!
//! Peers wired over a shared [`MemoryNetwork`], each with its own store,
//! simulated transport and validator.

use async_trait::async_trait;
use dt_01_voucher_registry::BincodeCodec;
use dt_02_channel_store::InMemoryKVStore;
use dt_03_network::{
    DataTransferNetwork, MemoryHost, MemoryNetwork, MessageReceiver, NetworkConfig, NetworkError,
    StreamNetwork, TransferMessage,
};
use dt_04_transport::{BlockPlan, SimulatedTransport};
use dt_05_channel_manager::{
    DataTransferApi, DataTransferConfig, DataTransferManager, RequestValidator,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_bus::{EventFilter, Subscription};
use shared_types::{
    ChannelEvent, ChannelId, ChannelState, ChannelStatus, Cid, EventCode, PeerId, Selector,
    TypedPayload, ValidationError, ValidationResult, Voucher, VoucherType,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Upper bound on any single wait in a scenario.
pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicVoucher {
    pub data: String,
}

impl VoucherType for BasicVoucher {
    const TYPE: &'static str = "BasicVoucher";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicResult {
    pub note: String,
}

impl VoucherType for BasicResult {
    const TYPE: &'static str = "BasicResult";
}

pub fn voucher(data: &str) -> Voucher {
    TypedPayload::from_typed(&BasicVoucher {
        data: data.to_string(),
    })
    .unwrap()
}

/// Validator answering from a script, then with a fallback verdict.
pub struct ScriptedValidator {
    script: Mutex<VecDeque<ValidationResult>>,
    fallback: ValidationResult,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedValidator {
    pub fn accept_all() -> Self {
        Self::with_fallback(ValidationResult::accept())
    }

    pub fn reject_all() -> Self {
        Self::with_fallback(ValidationResult::reject())
    }

    pub fn with_fallback(fallback: ValidationResult) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer the next validations with `verdicts`, in order.
    pub fn then(self, verdicts: impl IntoIterator<Item = ValidationResult>) -> Self {
        self.script.lock().extend(verdicts);
        self
    }

    /// Sleep before every verdict.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn verdict(&self) -> Result<ValidationResult, ValidationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

#[async_trait]
impl RequestValidator for ScriptedValidator {
    async fn validate_push(
        &self,
        _channel_id: &ChannelId,
        _sender: &PeerId,
        _voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        self.verdict().await
    }

    async fn validate_pull(
        &self,
        _channel_id: &ChannelId,
        _receiver: &PeerId,
        _voucher: &Voucher,
        _base_cid: &Cid,
        _selector: &Selector,
    ) -> Result<ValidationResult, ValidationError> {
        self.verdict().await
    }

    async fn validate_restart(
        &self,
        _channel_id: &ChannelId,
        _state: &ChannelState,
    ) -> Result<ValidationResult, ValidationError> {
        Ok(ValidationResult::accept())
    }
}

/// One node in a scenario.
pub struct TestPeer {
    pub id: PeerId,
    pub manager: Arc<DataTransferManager>,
    pub substrate: Arc<SimulatedTransport>,
    pub kv: Arc<InMemoryKVStore>,
    pub validator: Arc<ScriptedValidator>,
}

/// How to build a [`TestPeer`].
pub struct PeerBuilder {
    name: String,
    substrate: SimulatedTransport,
    kv: Arc<InMemoryKVStore>,
    validator: Arc<ScriptedValidator>,
    config: DataTransferConfig,
    register_types: bool,
}

impl PeerBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            substrate: SimulatedTransport::new(),
            kv: Arc::new(InMemoryKVStore::new()),
            validator: Arc::new(ScriptedValidator::accept_all()),
            config: DataTransferConfig::for_testing(),
            register_types: true,
        }
    }

    pub fn substrate(mut self, substrate: SimulatedTransport) -> Self {
        self.substrate = substrate;
        self
    }

    /// Play `blocks` blocks of `block_size` bytes, 5ms apart.
    pub fn plan(self, block_size: u64, blocks: u64) -> Self {
        self.substrate(
            SimulatedTransport::new().with_plan(BlockPlan::new(
                block_size,
                blocks,
                Duration::from_millis(5),
            )),
        )
    }

    pub fn kv(mut self, kv: Arc<InMemoryKVStore>) -> Self {
        self.kv = kv;
        self
    }

    pub fn validator(mut self, validator: ScriptedValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(mut self, config: DataTransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Leave the voucher registries empty.
    pub fn without_voucher_types(mut self) -> Self {
        self.register_types = false;
        self
    }

    /// Wire the peer onto `net` without starting it.
    pub fn build(self, net: &MemoryNetwork) -> TestPeer {
        let network = StreamNetwork::new(net.host(self.name.as_str()), NetworkConfig::for_testing());
        let substrate = Arc::new(self.substrate);
        let manager = DataTransferManager::new(
            Arc::new(network),
            substrate.clone(),
            self.kv.clone(),
            self.validator.clone(),
            self.config,
        );
        if self.register_types {
            manager
                .register_voucher_type(BasicVoucher::TYPE, BincodeCodec::<BasicVoucher>::new())
                .unwrap();
            manager
                .register_voucher_result_type(BasicResult::TYPE, BincodeCodec::<BasicResult>::new())
                .unwrap();
        }
        TestPeer {
            id: PeerId::new(self.name),
            manager,
            substrate,
            kv: self.kv,
            validator: self.validator,
        }
    }

    /// Wire and start.
    pub async fn start(self, net: &MemoryNetwork) -> TestPeer {
        let peer = self.build(net);
        peer.manager.start().await.unwrap();
        peer
    }
}

impl TestPeer {
    pub fn events(&self) -> Subscription {
        self.manager.subscribe_stream(EventFilter::all())
    }

    pub fn channel_events(&self, channel_id: &ChannelId) -> Subscription {
        self.manager
            .subscribe_stream(EventFilter::channel(channel_id.clone()))
    }

    pub async fn pull(&self, from: &TestPeer, cid: &str) -> ChannelId {
        self.manager
            .open_pull(&from.id, voucher("pull"), Cid::new(cid), Selector::all())
            .await
            .unwrap()
    }

    pub async fn push(&self, to: &TestPeer, cid: &str) -> ChannelId {
        self.manager
            .open_push(&to.id, voucher("push"), Cid::new(cid), Selector::all())
            .await
            .unwrap()
    }

    pub async fn state(&self, channel_id: &ChannelId) -> ChannelState {
        self.manager.get_channel(channel_id).await.unwrap()
    }

    /// Wait until the channel reaches `status`, then return its state.
    pub async fn wait_status(&self, channel_id: &ChannelId, status: ChannelStatus) -> ChannelState {
        self.wait_for(channel_id, &format!("status {status}"), |s| s.status == status)
            .await
    }

    /// Wait until `bytes` have been counted on the channel.
    pub async fn wait_bytes(&self, channel_id: &ChannelId, bytes: u64) -> ChannelState {
        self.wait_for(channel_id, &format!("{bytes} bytes"), |s| {
            s.transferred_bytes() >= bytes
        })
        .await
    }

    async fn wait_for(
        &self,
        channel_id: &ChannelId,
        what: &str,
        done: impl Fn(&ChannelState) -> bool,
    ) -> ChannelState {
        let waited = timeout(WAIT, async {
            loop {
                if let Ok(state) = self.manager.get_channel(channel_id).await {
                    if done(&state) {
                        return state;
                    }
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        match waited {
            Ok(state) => state,
            Err(_) => {
                let current = self.manager.get_channel(channel_id).await.map(|s| s.status);
                panic!("{channel_id} on {} never reached {what}, last seen {current:?}", self.id)
            }
        }
    }

    /// Wait until the substrate has been started `count` times for the channel.
    pub async fn wait_starts(&self, channel_id: &ChannelId, count: usize) {
        wait_until(|| self.substrate.start_count(channel_id) >= count).await;
    }
}

struct Inbox(mpsc::UnboundedSender<(PeerId, TransferMessage)>);

#[async_trait]
impl MessageReceiver for Inbox {
    async fn receive_message(&self, from: PeerId, message: TransferMessage) {
        let _ = self.0.send((from, message));
    }

    async fn receive_error(&self, _from: PeerId, _error: NetworkError) {}
}

/// A peer without a manager: sends hand-built messages and records what
/// comes back.
pub struct RawPeer {
    pub id: PeerId,
    network: StreamNetwork<MemoryHost>,
    inbox: mpsc::UnboundedReceiver<(PeerId, TransferMessage)>,
}

impl RawPeer {
    pub async fn start(name: &str, net: &MemoryNetwork) -> Self {
        let network = StreamNetwork::new(net.host(name), NetworkConfig::for_testing());
        let (tx, inbox) = mpsc::unbounded_channel();
        network.start(Arc::new(Inbox(tx))).await.unwrap();
        Self {
            id: PeerId::new(name),
            network,
            inbox,
        }
    }

    pub async fn send(&self, to: &TestPeer, message: TransferMessage) {
        self.network.send_message(&to.id, message).await.unwrap();
    }

    /// Next message, failing the test if none arrives.
    pub async fn next_message(&mut self) -> TransferMessage {
        match timeout(WAIT, self.inbox.recv()).await {
            Ok(Some((_, message))) => message,
            _ => panic!("{} received nothing", self.id),
        }
    }

    /// Next message if one arrives within `wait`.
    pub async fn try_next_message(&mut self, wait: Duration) -> Option<TransferMessage> {
        timeout(wait, self.inbox.recv())
            .await
            .ok()
            .flatten()
            .map(|(_, message)| message)
    }
}

/// Next event on `sub` with `code`, skipping others.
pub async fn next_event(sub: &mut Subscription, code: EventCode) -> ChannelEvent {
    timeout(WAIT, async {
        loop {
            match sub.recv().await {
                Some(event) if event.code == code => return event,
                Some(_) => continue,
                None => panic!("event bus closed while waiting for {code}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {code}"))
}

/// Every event already queued on `sub`.
pub fn drain(sub: &mut Subscription) -> Vec<ChannelEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = sub.try_recv() {
        events.push(event);
    }
    events
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Give in-flight messages time to land.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
