//! # Channel Events
//!
//! One `ChannelEvent` is produced per persisted transition and handed to the
//! event bus. Events are never stored; the snapshot they carry is.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::channel::ChannelState;
use crate::entities::ChannelId;

/// What happened to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCode {
    /// Channel created and Open sent, or inbound Open received.
    Open,
    /// Responder accepted the channel.
    Accept,
    /// Responder refused the channel.
    Rejected,
    /// Restart requested or accepted.
    Restart,
    /// Data sender handed bytes to the transport.
    DataSent,
    /// Data recipient received bytes.
    DataReceived,
    /// A voucher was attached to the channel.
    NewVoucher,
    /// A voucher result was attached to the channel.
    NewVoucherResult,
    PauseLocal,
    ResumeLocal,
    PauseRemote,
    ResumeRemote,
    /// Responder paused the channel because its byte budget ran out.
    DataLimitExceeded,
    /// One side finished, waiting for the other.
    Completing,
    /// Transfer complete. Published exactly once per channel.
    Complete,
    Cancel,
    /// The channel failed or a peer reported an error.
    Error,
    /// Channel reloaded from the store after a restart of the manager.
    Recovered,
}

impl EventCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventCode::Open => "Open",
            EventCode::Accept => "Accept",
            EventCode::Rejected => "Rejected",
            EventCode::Restart => "Restart",
            EventCode::DataSent => "DataSent",
            EventCode::DataReceived => "DataReceived",
            EventCode::NewVoucher => "NewVoucher",
            EventCode::NewVoucherResult => "NewVoucherResult",
            EventCode::PauseLocal => "PauseLocal",
            EventCode::ResumeLocal => "ResumeLocal",
            EventCode::PauseRemote => "PauseRemote",
            EventCode::ResumeRemote => "ResumeRemote",
            EventCode::DataLimitExceeded => "DataLimitExceeded",
            EventCode::Completing => "Completing",
            EventCode::Complete => "Complete",
            EventCode::Cancel => "Cancel",
            EventCode::Error => "Error",
            EventCode::Recovered => "Recovered",
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub code: EventCode,
    /// Free-form detail, e.g. the error text for `Error`.
    pub message: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    /// Channel as persisted by this transition.
    pub channel: ChannelState,
}

impl ChannelEvent {
    pub fn new(code: EventCode, channel: ChannelState, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            timestamp: crate::now_millis(),
            channel,
        }
    }

    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel.channel_id
    }
}
