//! # DT-03 Network Message Layer
//!
//! Moves data-transfer protocol messages between peers.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Defines the eleven protocol messages, frames them on byte streams and
//! delivers inbound ones to a [`MessageReceiver`]. Connection setup and peer
//! identity belong to the [`StreamHost`] underneath.
//!
//! ## Failure Isolation
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Malformed, truncated or oversized frame | that stream closes, `receive_error` fires |
//! | Outbound stream breaks | reopened, up to `max_send_attempts` |
//! | Peer unreachable | `SendFailed` to the caller |
//!
//! ## Module Structure
//!
//! ```text
//! dt-03-network/
//! ├── domain/       # TransferMessage, MessageCodec, NetworkError
//! ├── ports/        # DataTransferNetwork + MessageReceiver (inbound), StreamHost (outbound)
//! ├── adapters/     # MemoryHost, TcpHost (feature "tcp")
//! ├── service.rs    # StreamNetwork
//! └── config.rs     # NetworkConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{MemoryHost, MemoryNetwork};
#[cfg(feature = "tcp")]
pub use adapters::TcpHost;
pub use config::NetworkConfig;
pub use domain::{ErrorCode, MessageCodec, NetworkError, TransferMessage, WireEnvelope};
pub use ports::{BoxedStream, DataTransferNetwork, MessageReceiver, StreamHost};
pub use service::StreamNetwork;
