//! # Shared Types Crate
//!
//! Data model for the data-transfer workspace. Every crate that stores,
//! sends, validates or observes a channel speaks in these types.
//!
//! ## Contents
//!
//! - **entities**: identities and payloads (`PeerId`, `ChannelId`, `Cid`,
//!   `Selector`, `TypedPayload`)
//! - **channel**: the durable per-channel aggregate (`ChannelState`,
//!   `ChannelStatus`, `PauseFlags`)
//! - **validation**: the validator's verdict (`ValidationResult`)
//! - **events**: what the bus carries (`ChannelEvent`, `EventCode`)
//! - **errors**: cross-crate error types
//!
//! ## Design Principles
//!
//! - **Snapshots, not handles**: everything here is plain data; ownership of a
//!   live channel stays with the channel manager.
//! - **Opaque payloads**: vouchers and selectors are carried as bytes; only the
//!   voucher registry and the application interpret them.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod entities;
pub mod errors;
pub mod events;
pub mod validation;

pub use channel::*;
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use validation::*;

/// Milliseconds since the unix epoch.
///
/// Falls back to zero if the system clock is before the epoch.
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
