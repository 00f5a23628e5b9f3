//! # Channel Aggregate
//!
//! `ChannelState` is the durable record of one data exchange. It is owned by
//! a single channel actor; everyone else sees snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{ChannelId, Cid, Direction, PeerId, Role, Selector, Voucher, VoucherResult};

/// Lifecycle status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Created locally, Open not yet sent.
    New,
    /// Open sent, waiting for the responder.
    Open,
    /// Validator accepted; transport started, no data yet.
    Accepted,
    /// Data is flowing.
    Transferring,
    /// At least one pause hold is set.
    Paused,
    /// One side finished, waiting for the other.
    Completing,
    /// Terminal: all data exchanged.
    Completed,
    /// Terminal: cancelled by either side.
    Cancelled,
    /// Failed; can be restarted.
    Failed,
    /// Terminal: the responder refused the open request.
    Rejected,
    /// Restart in progress.
    Restarting,
}

impl ChannelStatus {
    /// Every status, in declaration order.
    pub const ALL: [ChannelStatus; 11] = [
        ChannelStatus::New,
        ChannelStatus::Open,
        ChannelStatus::Accepted,
        ChannelStatus::Transferring,
        ChannelStatus::Paused,
        ChannelStatus::Completing,
        ChannelStatus::Completed,
        ChannelStatus::Cancelled,
        ChannelStatus::Failed,
        ChannelStatus::Rejected,
        ChannelStatus::Restarting,
    ];

    /// No transition leaves a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChannelStatus::Completed | ChannelStatus::Cancelled | ChannelStatus::Rejected
        )
    }

    /// Statuses from which a local restart may be requested.
    #[must_use]
    pub fn is_restartable(self) -> bool {
        matches!(
            self,
            ChannelStatus::Failed
                | ChannelStatus::Transferring
                | ChannelStatus::Paused
                | ChannelStatus::Accepted
        )
    }

    /// Statuses in which the transport may be moving data.
    #[must_use]
    pub fn is_moving_data(self) -> bool {
        matches!(
            self,
            ChannelStatus::Accepted
                | ChannelStatus::Transferring
                | ChannelStatus::Paused
                | ChannelStatus::Completing
        )
    }

    /// Lower-case name used in logs and store diagnostics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelStatus::New => "new",
            ChannelStatus::Open => "open",
            ChannelStatus::Accepted => "accepted",
            ChannelStatus::Transferring => "transferring",
            ChannelStatus::Paused => "paused",
            ChannelStatus::Completing => "completing",
            ChannelStatus::Completed => "completed",
            ChannelStatus::Cancelled => "cancelled",
            ChannelStatus::Failed => "failed",
            ChannelStatus::Rejected => "rejected",
            ChannelStatus::Restarting => "restarting",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is holding a channel paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PauseFlags {
    /// Paused through the local API.
    pub local: bool,
    /// Paused by the remote peer.
    pub remote: bool,
    /// Responder is waiting for a voucher (for_pause or data limit).
    pub awaiting_voucher: bool,
}

impl PauseFlags {
    /// Whether any hold is set.
    #[must_use]
    pub fn any(&self) -> bool {
        self.local || self.remote || self.awaiting_voucher
    }
}

/// Durable per-channel aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub channel_id: ChannelId,
    pub direction: Direction,
    pub status: ChannelStatus,
    pub self_peer: PeerId,
    pub other_peer: PeerId,
    pub base_cid: Cid,
    pub selector: Selector,
    /// Bytes handed to the transport (data sender only).
    pub sent_bytes: u64,
    /// Bytes received (data recipient only).
    pub received_bytes: u64,
    /// Blocks queued to the transport (data sender only).
    pub queued_blocks: u64,
    /// Blocks received (data recipient only).
    pub received_blocks: u64,
    pub vouchers: Vec<Voucher>,
    pub voucher_results: Vec<VoucherResult>,
    /// Last human-readable message (error text, rejection reason).
    pub message: String,
    pub pause: PauseFlags,
    /// Byte budget granted by the responder's validator.
    pub data_limit: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ChannelState {
    /// Fresh channel in `New`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel_id: ChannelId,
        direction: Direction,
        self_peer: PeerId,
        base_cid: Cid,
        selector: Selector,
        voucher: Voucher,
        now: u64,
    ) -> Self {
        let other_peer = channel_id
            .other_party(&self_peer)
            .cloned()
            .unwrap_or_default();
        Self {
            channel_id,
            direction,
            status: ChannelStatus::New,
            self_peer,
            other_peer,
            base_cid,
            selector,
            sent_bytes: 0,
            received_bytes: 0,
            queued_blocks: 0,
            received_blocks: 0,
            vouchers: vec![voucher],
            voucher_results: Vec::new(),
            message: String::new(),
            pause: PauseFlags::default(),
            data_limit: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Role of `self_peer`.
    #[must_use]
    pub fn role(&self) -> Role {
        if self.self_peer == self.channel_id.initiator {
            Role::Requester
        } else {
            Role::Responder
        }
    }

    #[must_use]
    pub fn is_requester(&self) -> bool {
        self.role() == Role::Requester
    }

    /// Whether the local peer is the one sending data.
    ///
    /// Push initiators and pull responders send.
    #[must_use]
    pub fn is_data_sender(&self) -> bool {
        matches!(
            (self.direction, self.role()),
            (Direction::Push, Role::Requester) | (Direction::Pull, Role::Responder)
        )
    }

    /// Peer sending the data.
    #[must_use]
    pub fn data_sender(&self) -> &PeerId {
        if self.is_data_sender() {
            &self.self_peer
        } else {
            &self.other_peer
        }
    }

    /// Peer receiving the data.
    #[must_use]
    pub fn data_recipient(&self) -> &PeerId {
        if self.is_data_sender() {
            &self.other_peer
        } else {
            &self.self_peer
        }
    }

    /// Bytes moved in our direction of flow.
    #[must_use]
    pub fn transferred_bytes(&self) -> u64 {
        if self.is_data_sender() {
            self.sent_bytes
        } else {
            self.received_bytes
        }
    }

    /// Blocks moved in our direction of flow.
    #[must_use]
    pub fn transferred_blocks(&self) -> u64 {
        if self.is_data_sender() {
            self.queued_blocks
        } else {
            self.received_blocks
        }
    }

    /// Apply a progress delta. Counters only grow.
    pub fn record_progress(&mut self, bytes_delta: u64, blocks_delta: u64) {
        if self.is_data_sender() {
            self.sent_bytes = self.sent_bytes.saturating_add(bytes_delta);
            self.queued_blocks = self.queued_blocks.saturating_add(blocks_delta);
        } else {
            self.received_bytes = self.received_bytes.saturating_add(bytes_delta);
            self.received_blocks = self.received_blocks.saturating_add(blocks_delta);
        }
    }

    /// Whether the data limit has been hit.
    #[must_use]
    pub fn data_limit_reached(&self) -> bool {
        self.data_limit
            .is_some_and(|limit| self.transferred_bytes() >= limit)
    }

    /// Most recently attached voucher.
    #[must_use]
    pub fn last_voucher(&self) -> Option<&Voucher> {
        self.vouchers.last()
    }

    /// Most recent voucher result.
    #[must_use]
    pub fn last_voucher_result(&self) -> Option<&VoucherResult> {
        self.voucher_results.last()
    }

    /// Whether two channels move the same data between the same peers.
    #[must_use]
    pub fn same_exchange(&self, other: &ChannelState) -> bool {
        self.base_cid == other.base_cid
            && self.selector == other.selector
            && self.data_sender() == other.data_sender()
            && self.data_recipient() == other.data_recipient()
    }
}
