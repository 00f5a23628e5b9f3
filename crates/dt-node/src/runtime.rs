//! # Node Runtime
//!
//! Builds one [`DataTransferManager`] from a [`NodeConfig`].
//!
//! ## Wiring
//!
//! ```text
//!  NodeConfig ──► TcpHost ──► StreamNetwork ─┐
//!             ──► storage backend ───────────┼──► DataTransferManager
//!             ──► SimulatedTransport ────────┤
//!             ──► TokenValidator ────────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Bind the TCP listener and load the address book
//! 2. Open the storage backend
//! 3. Register the demo voucher type
//! 4. Start the manager (recovers persisted channels)
//! 5. Open configured demo requests

use crate::adapters::{DemoVoucher, TokenValidator};
use crate::config::{ConfigError, NodeConfig, StorageBackend, StorageConfig};
use dt_01_voucher_registry::BincodeCodec;
use dt_02_channel_store::{InMemoryKVStore, KVStoreError, KeyValueStore};
use dt_03_network::{NetworkError, StreamNetwork, TcpHost};
use dt_04_transport::{BlockPlan, SimulatedTransport};
use dt_05_channel_manager::{DataTransferApi, DataTransferError, DataTransferManager};
use shared_bus::SubscriptionHandle;
use shared_types::{
    ChannelEvent, ChannelId, Cid, EventCode, PayloadError, PeerId, Selector, TypedPayload,
    VoucherType,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("storage backend: {0}")]
    Storage(#[from] KVStoreError),

    #[error(transparent)]
    Transfer(#[from] DataTransferError),

    #[error(transparent)]
    Voucher(#[from] PayloadError),
}

/// A running data-transfer node.
pub struct NodeRuntime {
    config: NodeConfig,
    manager: Arc<DataTransferManager>,
    network: Arc<StreamNetwork<TcpHost>>,
    substrate: Arc<SimulatedTransport>,
    event_log: Option<SubscriptionHandle>,
}

impl NodeRuntime {
    /// Bind, open storage and wire the manager. Nothing runs until
    /// [`NodeRuntime::start`].
    pub async fn build(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let peer = PeerId::new(config.peer_id.clone());

        let host = TcpHost::bind(peer.clone(), config.listen_addr, config.network.hello_timeout())
            .await?;
        for entry in &config.peers {
            host.add_peer(PeerId::new(entry.peer_id.clone()), entry.addr);
        }
        let network = Arc::new(StreamNetwork::new(host, config.network.clone()));

        let kv = open_store(&config.storage)?;

        let plan = BlockPlan::new(
            config.substrate.block_size,
            config.substrate.blocks,
            Duration::from_millis(config.substrate.interval_ms),
        );
        let substrate = Arc::new(SimulatedTransport::new().with_plan(plan));

        let validator = Arc::new(TokenValidator::new(config.accept_token.clone()));

        let manager = DataTransferManager::new(
            network.clone(),
            substrate.clone(),
            kv,
            validator,
            config.transfer.clone(),
        );
        manager.register_voucher_type(DemoVoucher::TYPE, BincodeCodec::<DemoVoucher>::new())?;

        Ok(Self {
            config,
            manager,
            network,
            substrate,
            event_log: None,
        })
    }

    /// Start the manager, then open every configured request.
    pub async fn start(&mut self) -> Result<Vec<ChannelId>, NodeError> {
        info!("===========================================");
        info!("  Data Transfer Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.event_log = Some(self.manager.subscribe_to_events(log_event));
        self.manager.start().await?;

        info!(
            peer = %self.manager.local_peer(),
            addr = %self.local_addr()?,
            peers = self.config.peers.len(),
            backend = ?self.config.storage.backend,
            "Node running"
        );

        let mut opened = Vec::with_capacity(self.config.requests.len());
        for request in &self.config.requests {
            let peer = PeerId::new(request.peer_id.clone());
            let voucher = TypedPayload::from_typed(&DemoVoucher {
                token: request.token.clone(),
            })?;
            let cid = Cid::new(request.cid.clone());
            let channel_id = if request.push {
                self.manager.open_push(&peer, voucher, cid, Selector::all()).await?
            } else {
                self.manager.open_pull(&peer, voucher, cid, Selector::all()).await?
            };
            info!(channel_id = %channel_id, peer = %peer, push = request.push, "Demo request opened");
            opened.push(channel_id);
        }
        Ok(opened)
    }

    /// Stop the manager. Channels left running stay persisted.
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        info!("Initiating graceful shutdown...");
        if let Some(handle) = self.event_log.take() {
            self.manager.unsubscribe(handle);
        }
        self.manager.stop().await?;
        info!("Shutdown complete");
        Ok(())
    }

    pub fn manager(&self) -> &Arc<DataTransferManager> {
        &self.manager
    }

    pub fn substrate(&self) -> &Arc<SimulatedTransport> {
        &self.substrate
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NodeError> {
        Ok(self.network.host().local_addr()?)
    }

    /// Add a peer to the address book after start-up.
    pub fn add_peer(&self, peer: PeerId, addr: SocketAddr) {
        self.network.host().add_peer(peer, addr);
    }
}

/// Open the configured key-value backend.
pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, NodeError> {
    match storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory channel store; channels are lost on exit");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::RocksDb => {
            use crate::adapters::{RocksDbConfig, RocksDbStore};
            let config = RocksDbConfig {
                path: storage.data_dir.join("channels"),
                sync_writes: storage.sync_writes,
                ..RocksDbConfig::default()
            };
            Ok(Arc::new(RocksDbStore::open(config)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::RocksDb => Err(ConfigError::BackendUnavailable("rocksdb").into()),
    }
}

fn log_event(event: &ChannelEvent) -> Result<(), shared_bus::HandlerError> {
    let channel = &event.channel;
    match event.code {
        EventCode::Error | EventCode::Cancel => warn!(
            channel_id = %channel.channel_id,
            code = %event.code,
            status = %channel.status,
            message = %event.message,
            "Channel event"
        ),
        EventCode::DataSent | EventCode::DataReceived => tracing::debug!(
            channel_id = %channel.channel_id,
            code = %event.code,
            bytes = channel.transferred_bytes(),
            blocks = channel.transferred_blocks(),
            "Channel progress"
        ),
        _ => info!(
            channel_id = %channel.channel_id,
            code = %event.code,
            status = %channel.status,
            "Channel event"
        ),
    }
    Ok(())
}
