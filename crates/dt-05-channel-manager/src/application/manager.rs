//! # Data Transfer Manager
//!
//! Owns the channel actors and routes work to them.
//!
//! ```text
//!  application ──► DataTransferManager ──► ChannelHandle ──► actor
//!  network ─────► InboundRouter ─────────┘                    │
//!  transport ───► dispatcher task ───────┘                    ▼
//!                                        store · network · transport · bus
//! ```
//!
//! ## Lifecycle
//!
//! `Created → Starting → Running → Stopping → Stopped`. Channel operations
//! are refused with `NotRunning` outside `Running`. `start()` returns only
//! after every persisted channel has been re-attached.

use super::actor::{spawn_channel, ChannelHandle, ChannelMap, Command, Reply};
use super::context::ChannelContext;
use crate::config::DataTransferConfig;
use crate::domain::{DataTransferError, DataTransferResult};
use crate::ports::inbound::DataTransferApi;
use crate::ports::outbound::RequestValidator;
use async_trait::async_trait;
use dt_01_voucher_registry::{VoucherCodec, VoucherRegistry};
use dt_02_channel_store::{ChannelStateStore, ChannelStore, KeyValueStore, StoreError};
use dt_03_network::{
    DataTransferNetwork, ErrorCode, MessageReceiver, NetworkError, TransferMessage,
};
use dt_04_transport::{BlockTransport, TransportAdapter, TransportEvents};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventFilter, EventHandler, InMemoryEventBus, Subscription, SubscriptionHandle};
use shared_types::{
    now_millis, ChannelId, ChannelState, ChannelStatus, Cid, Direction, PeerId, Selector,
    TransferId, TypeIdentifier, Voucher,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Manager lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    /// Recovering persisted channels.
    Starting,
    Running,
    Stopping,
    Stopped,
}

pub struct DataTransferManager {
    ctx: Arc<ChannelContext>,
    config: DataTransferConfig,
    channels: ChannelMap,
    lifecycle: RwLock<Lifecycle>,
    next_id: Mutex<TransferId>,
    transport_events: Mutex<Option<TransportEvents>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    me: Weak<DataTransferManager>,
}

impl DataTransferManager {
    /// Wire up a manager. Must be called inside a tokio runtime.
    ///
    /// Nothing is recovered and no message is accepted until [`start`].
    ///
    /// [`start`]: DataTransferManager::start
    pub fn new(
        network: Arc<dyn DataTransferNetwork>,
        substrate: Arc<dyn BlockTransport>,
        kv: Arc<dyn KeyValueStore>,
        validator: Arc<dyn RequestValidator>,
        config: DataTransferConfig,
    ) -> Arc<Self> {
        let (transport, transport_events) =
            TransportAdapter::new(substrate, config.transport.clone());
        let store = ChannelStore::new(kv, config.namespace.clone());

        let ctx = Arc::new(ChannelContext {
            self_peer: network.local_peer(),
            store: Arc::new(store),
            network,
            transport: Arc::new(transport),
            validator,
            vouchers: Arc::new(VoucherRegistry::new("voucher")),
            voucher_results: Arc::new(VoucherRegistry::new("voucher-result")),
            bus: Arc::new(InMemoryEventBus::new()),
            inbox_warning_threshold: config.inbox_warning_threshold,
        });

        Arc::new_cyclic(|me| Self {
            ctx,
            config,
            channels: Arc::new(RwLock::new(HashMap::new())),
            lifecycle: RwLock::new(Lifecycle::Created),
            next_id: Mutex::new(TransferId(1)),
            transport_events: Mutex::new(Some(transport_events)),
            dispatcher: Mutex::new(None),
            me: me.clone(),
        })
    }

    #[must_use]
    pub fn local_peer(&self) -> &PeerId {
        &self.ctx.self_peer
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read()
    }

    #[must_use]
    pub fn config(&self) -> &DataTransferConfig {
        &self.config
    }

    /// Recover persisted channels, then start accepting messages.
    pub async fn start(&self) -> DataTransferResult<()> {
        {
            let mut lifecycle = self.lifecycle.write();
            match *lifecycle {
                Lifecycle::Created => *lifecycle = Lifecycle::Starting,
                Lifecycle::Running | Lifecycle::Starting => return Ok(()),
                Lifecycle::Stopping | Lifecycle::Stopped => {
                    return Err(DataTransferError::NotRunning)
                }
            }
        }

        match self.start_inner().await {
            Ok(recovered) => {
                *self.lifecycle.write() = Lifecycle::Running;
                info!(peer = %self.ctx.self_peer, recovered, "Data transfer manager started");
                Ok(())
            }
            Err(e) => {
                error!(peer = %self.ctx.self_peer, error = %e, "Data transfer manager failed to start");
                *self.lifecycle.write() = Lifecycle::Created;
                Err(e)
            }
        }
    }

    async fn start_inner(&self) -> DataTransferResult<usize> {
        let highest = self.ctx.store.highest_transfer_id(&self.ctx.self_peer)?;
        *self.next_id.lock() = highest.map_or(TransferId(1), TransferId::next);

        if let Some(events) = self.transport_events.lock().take() {
            let dispatcher = tokio::spawn(dispatch_transport_events(events, self.channels.clone()));
            *self.dispatcher.lock() = Some(dispatcher);
        }

        let recovered = self.recover().await?;

        let router = Arc::new(InboundRouter {
            manager: self.me.clone(),
        });
        self.ctx.network.start(router).await?;
        Ok(recovered)
    }

    /// Re-attach every non-terminal persisted channel.
    async fn recover(&self) -> DataTransferResult<usize> {
        let states = self.ctx.store.list_non_terminal()?;
        let mut pending = Vec::new();
        for state in states {
            if state.status == ChannelStatus::Failed {
                continue;
            }
            let channel_id = state.channel_id.clone();
            let Some(handle) = self.insert_new(state) else {
                continue;
            };
            let (reply, rx) = oneshot::channel();
            if handle.send(Command::Recover { reply }) {
                pending.push((channel_id, rx));
            }
        }

        let mut recovered = 0;
        for (channel_id, rx) in pending {
            match rx.await {
                Ok(Ok(())) => recovered += 1,
                Ok(Err(e)) => {
                    error!(channel_id = %channel_id, error = %e, "Failed to recover channel");
                }
                Err(_) => warn!(channel_id = %channel_id, "Channel actor stopped during recovery"),
            }
        }
        Ok(recovered)
    }

    /// Drain in-flight channels, optionally cancel the rest, release the
    /// network. Calling it again is a no-op.
    pub async fn stop(&self) -> DataTransferResult<()> {
        {
            let mut lifecycle = self.lifecycle.write();
            match *lifecycle {
                Lifecycle::Running => *lifecycle = Lifecycle::Stopping,
                Lifecycle::Created => {
                    *lifecycle = Lifecycle::Stopped;
                    return Ok(());
                }
                Lifecycle::Starting | Lifecycle::Stopping | Lifecycle::Stopped => return Ok(()),
            }
        }
        info!(peer = %self.ctx.self_peer, "Stopping data transfer manager");

        let drain_timeout = self.config.shutdown.drain_timeout();
        let drained = tokio::time::timeout(drain_timeout, async {
            while !self.in_progress_handles().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok();

        if !drained {
            let remaining = self.in_progress_handles();
            if self.config.shutdown.cancel_on_shutdown {
                info!(count = remaining.len(), "Cancelling channels still in flight");
                for handle in remaining {
                    let channel_id = handle.snapshot().channel_id;
                    if let Err(e) = handle.request(|reply| Command::Cancel { reply }).await {
                        warn!(channel_id = %channel_id, error = %e, "Failed to cancel channel on shutdown");
                    }
                }
            } else {
                info!(count = remaining.len(), "Leaving channels in flight for recovery");
            }
        }

        // Whatever is still in flight keeps its stored status; only the
        // substrate is let go.
        for handle in self.in_progress_handles() {
            let channel_id = handle.snapshot().channel_id;
            if let Err(e) = handle.request(|reply| Command::Detach { reply }).await {
                debug!(channel_id = %channel_id, error = %e, "Channel not detached on shutdown");
            }
        }

        self.ctx.network.stop().await;
        self.shutdown_actors();
        *self.lifecycle.write() = Lifecycle::Stopped;
        info!(peer = %self.ctx.self_peer, "Data transfer manager stopped");
        Ok(())
    }

    fn shutdown_actors(&self) {
        if let Some(dispatcher) = self.dispatcher.lock().take() {
            dispatcher.abort();
        }
        self.channels.write().clear();
    }

    pub fn register_voucher_type(
        &self,
        type_id: impl Into<TypeIdentifier>,
        codec: impl VoucherCodec,
    ) -> DataTransferResult<()> {
        Ok(self.ctx.vouchers.register(type_id, codec)?)
    }

    pub fn register_voucher_result_type(
        &self,
        type_id: impl Into<TypeIdentifier>,
        codec: impl VoucherCodec,
    ) -> DataTransferResult<()> {
        Ok(self.ctx.voucher_results.register(type_id, codec)?)
    }

    /// Call `handler` for every channel event, in publish order.
    pub fn subscribe_to_events(&self, handler: impl EventHandler) -> SubscriptionHandle {
        self.ctx.bus.subscribe(handler)
    }

    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.ctx.bus.unsubscribe(handle)
    }

    /// Stream of events matching `filter`.
    pub fn subscribe_stream(&self, filter: EventFilter) -> Subscription {
        self.ctx.bus.subscribe_stream(filter)
    }

    #[must_use]
    pub fn event_bus(&self) -> &Arc<InMemoryEventBus> {
        &self.ctx.bus
    }

    /// Channels with a live actor. Finished channels drop out and are read
    /// from the store on demand.
    #[must_use]
    pub fn active_channels(&self) -> usize {
        self.channels.read().len()
    }

    fn ensure_running(&self) -> DataTransferResult<()> {
        if *self.lifecycle.read() == Lifecycle::Running {
            Ok(())
        } else {
            Err(DataTransferError::NotRunning)
        }
    }

    fn accepting_messages(&self) -> bool {
        matches!(
            *self.lifecycle.read(),
            Lifecycle::Starting | Lifecycle::Running
        )
    }

    fn in_progress_handles(&self) -> Vec<ChannelHandle> {
        self.channels
            .read()
            .values()
            .filter(|handle| handle.is_in_progress())
            .cloned()
            .collect()
    }

    /// Spawn an actor unless one already owns the channel.
    fn insert_new(&self, state: ChannelState) -> Option<ChannelHandle> {
        let mut channels = self.channels.write();
        if channels.contains_key(&state.channel_id) {
            return None;
        }
        let channel_id = state.channel_id.clone();
        let handle = spawn_channel(self.ctx.clone(), &self.channels, state);
        channels.insert(channel_id, handle.clone());
        Some(handle)
    }

    /// Actor for `channel_id`, loading it from the store if needed.
    fn handle_for(&self, channel_id: &ChannelId) -> DataTransferResult<ChannelHandle> {
        if let Some(handle) = self.channels.read().get(channel_id) {
            return Ok(handle.clone());
        }

        let state = self.ctx.store.get(channel_id).map_err(|e| match e {
            StoreError::NotFound(id) => DataTransferError::NotFound(id),
            other => other.into(),
        })?;
        debug!(channel_id = %channel_id, status = %state.status, "Loaded channel from store");

        let mut channels = self.channels.write();
        let handle = channels
            .entry(channel_id.clone())
            .or_insert_with(|| spawn_channel(self.ctx.clone(), &self.channels, state))
            .clone();
        Ok(handle)
    }

    /// Queue `command` for the channel's actor. An actor that retired
    /// between lookup and send is replaced by one loaded from the store.
    fn deliver(&self, channel_id: &ChannelId, command: Command) -> DataTransferResult<()> {
        let mut command = command;
        for _ in 0..2 {
            let handle = self.handle_for(channel_id)?;
            match handle.try_send(command) {
                Ok(()) => return Ok(()),
                Err(returned) => {
                    let mut channels = self.channels.write();
                    if channels
                        .get(channel_id)
                        .is_some_and(|current| current.same_actor(&handle))
                    {
                        channels.remove(channel_id);
                    }
                    command = returned;
                }
            }
        }
        Err(DataTransferError::NotRunning)
    }

    async fn open(
        &self,
        direction: Direction,
        peer: &PeerId,
        voucher: Voucher,
        base_cid: Cid,
        selector: Selector,
    ) -> DataTransferResult<ChannelId> {
        self.ensure_running()?;
        if peer == &self.ctx.self_peer {
            return Err(DataTransferError::Protocol(
                "cannot open a channel to ourselves".to_string(),
            ));
        }
        let wire_voucher = self.ctx.encode_voucher(&voucher)?;

        let id = {
            let mut next = self.next_id.lock();
            let id = *next;
            *next = id.next();
            id
        };
        let channel_id = ChannelId::new(self.ctx.self_peer.clone(), peer.clone(), id);
        let state = ChannelState::new(
            channel_id.clone(),
            direction,
            self.ctx.self_peer.clone(),
            base_cid,
            selector,
            voucher,
            now_millis(),
        );

        let handle = self.insert_new(state).ok_or_else(|| {
            DataTransferError::invalid_state(&channel_id, ChannelStatus::New, "open")
        })?;
        let result = handle
            .request(|reply| Command::OpenLocal {
                wire_voucher,
                reply,
            })
            .await;

        match result {
            Ok(()) => {
                info!(channel_id = %channel_id, peer = %peer, direction = %direction, "Channel opened");
                Ok(channel_id)
            }
            Err(e) => {
                if e.is_store_error() {
                    self.channels.write().remove(&channel_id);
                }
                Err(e)
            }
        }
    }

    async fn route_message(&self, from: PeerId, message: TransferMessage) {
        if matches!(message, TransferMessage::Open { .. }) {
            self.accept_open_request(from, message).await;
            return;
        }

        let channel_id = message.channel_id().clone();
        let kind = message.kind();
        let is_error = matches!(message, TransferMessage::Error { .. });
        let command = Command::Remote {
            from: from.clone(),
            message,
        };
        match self.deliver(&channel_id, command) {
            Ok(()) => {}
            Err(DataTransferError::NotFound(_)) => {
                if !is_error {
                    self.reply_error(
                        &from,
                        channel_id,
                        ErrorCode::Protocol,
                        format!("{kind} for unknown channel"),
                    )
                    .await;
                }
            }
            Err(e) => {
                error!(channel_id = %channel_id, error = %e, "Failed to route message");
            }
        }
    }

    /// Inbound Open: sanity checks and the tie-break, then hand the new
    /// channel to its actor.
    async fn accept_open_request(&self, from: PeerId, message: TransferMessage) {
        let TransferMessage::Open {
            channel_id,
            direction,
            base_cid,
            selector,
            voucher,
        } = message
        else {
            return;
        };

        let self_peer = &self.ctx.self_peer;
        if channel_id.responder != *self_peer || channel_id.initiator != from || &from == self_peer
        {
            self.reply_error(
                &from,
                channel_id,
                ErrorCode::Protocol,
                "open request with mismatched channel id",
            )
            .await;
            return;
        }

        let known = self.channels.read().contains_key(&channel_id)
            || self.ctx.store.get(&channel_id).is_ok();
        if known {
            self.reply_error(&from, channel_id, ErrorCode::Protocol, "duplicate open")
                .await;
            return;
        }

        let candidate = ChannelState::new(
            channel_id.clone(),
            direction,
            self_peer.clone(),
            base_cid,
            selector,
            voucher,
            now_millis(),
        );

        if let Some(winner) = self.tie_break_winner(&candidate) {
            info!(loser = %channel_id, winner = %winner, "Concurrent open resolved in favour of local channel");
            self.reply_error(
                &from,
                channel_id,
                ErrorCode::Duplicate { winner },
                "same exchange already opened",
            )
            .await;
            return;
        }

        match self.insert_new(candidate) {
            Some(handle) => {
                handle.send(Command::OpenRemote);
            }
            None => {
                self.reply_error(&from, channel_id, ErrorCode::Protocol, "duplicate open")
                    .await;
            }
        }
    }

    /// A live local channel for the same exchange that outranks
    /// `candidate`, if any.
    ///
    /// A channel still opening wins only with the lower id. One the peer has
    /// already accepted always wins: the peer accepted it while its own
    /// request was either not yet sent or outranked.
    fn tie_break_winner(&self, candidate: &ChannelState) -> Option<ChannelId> {
        self.channels
            .read()
            .values()
            .map(ChannelHandle::snapshot)
            .filter(|local| {
                local.is_requester()
                    && !local.status.is_terminal()
                    && local.status != ChannelStatus::Failed
                    && local.same_exchange(candidate)
            })
            .find(|local| {
                !matches!(local.status, ChannelStatus::New | ChannelStatus::Open)
                    || local.channel_id.precedes(&candidate.channel_id)
            })
            .map(|local| local.channel_id)
    }

    async fn reply_error(
        &self,
        to: &PeerId,
        channel_id: ChannelId,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        let message = message.into();
        warn!(peer = %to, channel_id = %channel_id, code = %code, reason = %message, "Refusing message");
        let reply = TransferMessage::error(channel_id, code, message);
        if let Err(e) = self.ctx.network.send_message(to, reply).await {
            debug!(peer = %to, error = %e, "Failed to send error reply");
        }
    }

    async fn request_on(
        &self,
        channel_id: &ChannelId,
        make: impl FnOnce(Reply<()>) -> Command,
    ) -> DataTransferResult<()> {
        self.ensure_running()?;
        let (reply, rx) = oneshot::channel();
        self.deliver(channel_id, make(reply))?;
        rx.await.unwrap_or(Err(DataTransferError::NotRunning))
    }
}

impl Drop for DataTransferManager {
    fn drop(&mut self) {
        self.shutdown_actors();
    }
}

#[async_trait]
impl DataTransferApi for DataTransferManager {
    async fn open_push(
        &self,
        peer: &PeerId,
        voucher: Voucher,
        base_cid: Cid,
        selector: Selector,
    ) -> DataTransferResult<ChannelId> {
        self.open(Direction::Push, peer, voucher, base_cid, selector)
            .await
    }

    async fn open_pull(
        &self,
        peer: &PeerId,
        voucher: Voucher,
        base_cid: Cid,
        selector: Selector,
    ) -> DataTransferResult<ChannelId> {
        self.open(Direction::Pull, peer, voucher, base_cid, selector)
            .await
    }

    async fn send_voucher(
        &self,
        channel_id: &ChannelId,
        voucher: Voucher,
    ) -> DataTransferResult<()> {
        self.request_on(channel_id, |reply| Command::SendVoucher { voucher, reply })
            .await
    }

    async fn cancel(&self, channel_id: &ChannelId) -> DataTransferResult<()> {
        self.request_on(channel_id, |reply| Command::Cancel { reply })
            .await
    }

    async fn restart(&self, channel_id: &ChannelId) -> DataTransferResult<()> {
        self.request_on(channel_id, |reply| Command::Restart { reply })
            .await
    }

    async fn pause(&self, channel_id: &ChannelId) -> DataTransferResult<()> {
        self.request_on(channel_id, |reply| Command::Pause { reply })
            .await
    }

    async fn resume(&self, channel_id: &ChannelId) -> DataTransferResult<()> {
        self.request_on(channel_id, |reply| Command::Resume { reply })
            .await
    }

    async fn get_channel(&self, channel_id: &ChannelId) -> DataTransferResult<ChannelState> {
        self.ensure_running()?;
        if let Some(handle) = self.channels.read().get(channel_id) {
            return Ok(handle.snapshot());
        }
        self.ctx.store.get(channel_id).map_err(|e| match e {
            StoreError::NotFound(id) => DataTransferError::NotFound(id),
            other => other.into(),
        })
    }

    async fn in_progress_channels(&self) -> DataTransferResult<Vec<ChannelState>> {
        self.ensure_running()?;
        let mut states: Vec<_> = self
            .in_progress_handles()
            .iter()
            .map(ChannelHandle::snapshot)
            .collect();
        states.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.channel_id.id.cmp(&b.channel_id.id))
        });
        Ok(states)
    }

    async fn list_channels(&self) -> DataTransferResult<Vec<ChannelState>> {
        self.ensure_running()?;
        Ok(self.ctx.store.list_all()?)
    }
}

/// Hands network traffic to the manager without holding it alive.
struct InboundRouter {
    manager: Weak<DataTransferManager>,
}

#[async_trait]
impl MessageReceiver for InboundRouter {
    async fn receive_message(&self, from: PeerId, message: TransferMessage) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        if !manager.accepting_messages() {
            debug!(peer = %from, kind = message.kind(), "Manager not running, message dropped");
            return;
        }
        manager.route_message(from, message).await;
    }

    async fn receive_error(&self, from: PeerId, error: NetworkError) {
        warn!(peer = %from, error = %error, "Inbound stream failed");
    }
}

async fn dispatch_transport_events(mut events: TransportEvents, channels: ChannelMap) {
    while let Some((channel_id, event)) = events.recv().await {
        let handle = channels.read().get(&channel_id).cloned();
        match handle {
            Some(handle) => {
                if !handle.send(Command::Transport(event)) {
                    debug!(channel_id = %channel_id, "Channel actor gone, transport event dropped");
                }
            }
            None => debug!(channel_id = %channel_id, "Transport event for unknown channel dropped"),
        }
    }
}
