//! # Transport Types
//!
//! Two event vocabularies meet here:
//!
//! - [`SubstrateEvent`]: what the block-transport substrate reports, including
//!   transient stalls.
//! - [`TransportEvent`]: what the adapter forwards to channel actors, after
//!   retries and replay suppression.

use serde::{Deserialize, Serialize};
use shared_types::{ChannelId, Cid, PeerId, Selector};

/// Progress already acknowledged for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResumePoint {
    pub bytes: u64,
    pub blocks: u64,
}

impl ResumePoint {
    pub fn new(bytes: u64, blocks: u64) -> Self {
        Self { bytes, blocks }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bytes == 0 && self.blocks == 0
    }
}

/// Everything the substrate needs to move one channel's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub channel_id: ChannelId,
    /// The other party.
    pub peer: PeerId,
    pub base_cid: Cid,
    pub selector: Selector,
    /// Whether the local side sends the data.
    pub is_sender: bool,
    /// Where to pick up. `None` starts from the beginning.
    pub resume_from: Option<ResumePoint>,
}

/// Report from the substrate about one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstrateEvent {
    /// Bytes and blocks moved since the previous report.
    Progress { bytes: u64, blocks: u64 },
    /// Transfer stopped moving; the adapter may retry.
    Stalled { reason: String },
    Completed,
    /// Unrecoverable.
    Failed { reason: String },
}

/// How a transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Failed(String),
}

/// Event delivered to a channel actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// New data beyond anything previously acknowledged.
    Progress { bytes_delta: u64, blocks_delta: u64 },
    /// Final event for this transport run.
    Finished(TransferOutcome),
}
