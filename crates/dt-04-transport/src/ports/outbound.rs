//! # Outbound Ports (Driven Ports)
//!
//! The block-transport substrate: whatever actually moves content-addressed
//! blocks between peers.

use crate::domain::errors::TransportError;
use crate::domain::types::{SubstrateEvent, TransferRequest};
use async_trait::async_trait;
use shared_types::ChannelId;
use tokio::sync::mpsc;

/// Event tagged with the run it belongs to.
#[derive(Debug, Clone)]
pub(crate) struct SinkEvent {
    pub channel_id: ChannelId,
    pub generation: u64,
    pub event: SubstrateEvent,
}

/// Where a substrate reports on one transfer run.
///
/// Each (re)start gets a fresh sink; reports through a sink from an earlier
/// run are ignored by the adapter.
#[derive(Debug, Clone)]
pub struct SubstrateSink {
    channel_id: ChannelId,
    generation: u64,
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl SubstrateSink {
    pub(crate) fn new(
        channel_id: ChannelId,
        generation: u64,
        tx: mpsc::UnboundedSender<SinkEvent>,
    ) -> Self {
        Self {
            channel_id,
            generation,
            tx,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Report an event. Returns `false` once the adapter is gone.
    pub fn emit(&self, event: SubstrateEvent) -> bool {
        self.tx
            .send(SinkEvent {
                channel_id: self.channel_id.clone(),
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn progress(&self, bytes: u64, blocks: u64) -> bool {
        self.emit(SubstrateEvent::Progress { bytes, blocks })
    }

    pub fn stalled(&self, reason: impl Into<String>) -> bool {
        self.emit(SubstrateEvent::Stalled {
            reason: reason.into(),
        })
    }

    pub fn completed(&self) -> bool {
        self.emit(SubstrateEvent::Completed)
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.emit(SubstrateEvent::Failed {
            reason: reason.into(),
        })
    }
}

/// Block-transport substrate.
///
/// Production: a graph-exchange protocol over the peer-to-peer host.
/// Testing: `SimulatedTransport`.
#[async_trait]
pub trait BlockTransport: Send + Sync + 'static {
    /// Begin moving data for `request`, reporting through `sink`.
    ///
    /// A start for a channel that is already running replaces the old run.
    async fn start(&self, request: TransferRequest, sink: SubstrateSink)
        -> Result<(), TransportError>;

    async fn pause(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    async fn resume(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    /// Abort the transfer. No further reports are expected.
    async fn cancel(&self, channel_id: &ChannelId) -> Result<(), TransportError>;

    /// Whether `start` honours `TransferRequest::resume_from`.
    fn supports_resume(&self) -> bool;
}
