//! # Transition Table
//!
//! The only status moves a channel may make. Every commit in the channel
//! actor goes through [`can_transition`]; a terminal status has no exits and
//! `Failed` leaves only through `Restarting`.

use shared_types::ChannelStatus;
use ChannelStatus::*;

/// Statuses reachable from `from` in one step.
#[must_use]
pub fn legal_targets(from: ChannelStatus) -> &'static [ChannelStatus] {
    match from {
        New => &[Open, Accepted, Failed, Cancelled],
        Open => &[Accepted, Paused, Rejected, Failed, Cancelled],
        Accepted => &[Transferring, Paused, Completing, Failed, Cancelled, Restarting],
        Transferring => &[Paused, Completing, Failed, Cancelled, Restarting],
        Paused => &[
            Accepted,
            Transferring,
            Completing,
            Failed,
            Cancelled,
            Restarting,
        ],
        Completing => &[Completed, Failed, Cancelled],
        Restarting => &[Accepted, Paused, Failed, Cancelled],
        Failed => &[Restarting],
        Completed | Cancelled | Rejected => &[],
    }
}

/// Whether `from -> to` is legal. Staying put is always allowed.
#[must_use]
pub fn can_transition(from: ChannelStatus, to: ChannelStatus) -> bool {
    from == to || legal_targets(from).contains(&to)
}

/// Status a channel returns to once every pause hold is released.
#[must_use]
pub fn unpaused_status(transferred_blocks: u64, transferred_bytes: u64) -> ChannelStatus {
    if transferred_blocks > 0 || transferred_bytes > 0 {
        Transferring
    } else {
        Accepted
    }
}
