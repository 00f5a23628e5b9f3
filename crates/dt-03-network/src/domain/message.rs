//! # Protocol Messages
//!
//! Everything two data-transfer peers say to each other. Every message names
//! the channel it concerns.
//!
//! ## Request / Response Pairs
//!
//! | Sent by | Message | Answered by |
//! |---------|---------|-------------|
//! | requester | `Open` | `Accept` or `Error(Rejected)` |
//! | requester | `Voucher` | `VoucherResult` |
//! | requester | `Restart` | `Accept` |
//! | responder | `RestartExisting` | `Restart` |
//! | either | `Pause`, `Resume`, `Complete`, `Cancel` | nothing |
//! | either | `Error` | never answered |
//!
//! Voucher payloads travel in their registered wire form.

use serde::{Deserialize, Serialize};
use shared_types::{ChannelId, Cid, Direction, Selector, TypedPayload};
use std::fmt;

/// Why a peer sent an `Error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The validator refused the open request or a voucher.
    Rejected,
    /// A concurrently opened channel for the same exchange won the tie-break.
    Duplicate { winner: ChannelId },
    /// Malformed, unexpected or out-of-order message.
    Protocol,
    /// The transfer failed below the protocol.
    Transport,
    /// The peer failed internally (e.g. its store).
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Rejected => f.write_str("rejected"),
            ErrorCode::Duplicate { winner } => write!(f, "duplicate of {winner}"),
            ErrorCode::Protocol => f.write_str("protocol"),
            ErrorCode::Transport => f.write_str("transport"),
            ErrorCode::Internal => f.write_str("internal"),
        }
    }
}

/// A data-transfer protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMessage {
    /// Ask the responder to validate and start a transfer.
    Open {
        channel_id: ChannelId,
        direction: Direction,
        base_cid: Cid,
        selector: Selector,
        voucher: TypedPayload,
    },
    /// The responder accepted an `Open` or a `Restart`.
    Accept {
        channel_id: ChannelId,
        voucher_result: Option<TypedPayload>,
        /// The responder holds the channel paused until another voucher.
        paused: bool,
    },
    /// An additional voucher from the requester.
    Voucher {
        channel_id: ChannelId,
        voucher: TypedPayload,
    },
    /// The responder's answer to a `Voucher`.
    VoucherResult {
        channel_id: ChannelId,
        accepted: bool,
        voucher_result: Option<TypedPayload>,
        paused: bool,
    },
    Error {
        channel_id: ChannelId,
        code: ErrorCode,
        message: String,
    },
    Pause { channel_id: ChannelId },
    Resume { channel_id: ChannelId },
    /// The sender's side of the transfer is done.
    Complete { channel_id: ChannelId },
    Cancel { channel_id: ChannelId },
    /// Requester asks to resume an existing channel.
    Restart { channel_id: ChannelId },
    /// Responder asks the requester to send `Restart`.
    RestartExisting { channel_id: ChannelId },
}

impl TransferMessage {
    /// The channel this message concerns.
    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            TransferMessage::Open { channel_id, .. }
            | TransferMessage::Accept { channel_id, .. }
            | TransferMessage::Voucher { channel_id, .. }
            | TransferMessage::VoucherResult { channel_id, .. }
            | TransferMessage::Error { channel_id, .. }
            | TransferMessage::Pause { channel_id }
            | TransferMessage::Resume { channel_id }
            | TransferMessage::Complete { channel_id }
            | TransferMessage::Cancel { channel_id }
            | TransferMessage::Restart { channel_id }
            | TransferMessage::RestartExisting { channel_id } => channel_id,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TransferMessage::Open { .. } => "Open",
            TransferMessage::Accept { .. } => "Accept",
            TransferMessage::Voucher { .. } => "Voucher",
            TransferMessage::VoucherResult { .. } => "VoucherResult",
            TransferMessage::Error { .. } => "Error",
            TransferMessage::Pause { .. } => "Pause",
            TransferMessage::Resume { .. } => "Resume",
            TransferMessage::Complete { .. } => "Complete",
            TransferMessage::Cancel { .. } => "Cancel",
            TransferMessage::Restart { .. } => "Restart",
            TransferMessage::RestartExisting { .. } => "RestartExisting",
        }
    }

    /// Whether only the channel's initiator may send this message.
    #[must_use]
    pub fn is_requester_only(&self) -> bool {
        matches!(
            self,
            TransferMessage::Open { .. }
                | TransferMessage::Voucher { .. }
                | TransferMessage::Restart { .. }
        )
    }

    /// Whether only the channel's responder may send this message.
    #[must_use]
    pub fn is_responder_only(&self) -> bool {
        matches!(
            self,
            TransferMessage::Accept { .. }
                | TransferMessage::VoucherResult { .. }
                | TransferMessage::RestartExisting { .. }
        )
    }

    /// Convenience constructor for `Error`.
    pub fn error(channel_id: ChannelId, code: ErrorCode, message: impl Into<String>) -> Self {
        TransferMessage::Error {
            channel_id,
            code,
            message: message.into(),
        }
    }
}
