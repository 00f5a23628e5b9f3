//! # DT-04 Transport Adapter
//!
//! Drives the block-transport substrate on behalf of channel actors.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Channels do not move data themselves. They ask this adapter to start,
//! pause, resume or cancel a transfer and receive [`TransportEvent`]s back:
//! progress deltas and one final outcome per run.
//!
//! ## Guarantees
//!
//! - A stall is retried up to `max_retries` times with exponential backoff
//!   before the run is reported as failed.
//! - Progress deltas never count the same bytes twice, even when a
//!   substrate without resume support replays from zero.
//! - Nothing is forwarded for a channel after `cancel`, or from a run that
//!   has been superseded by a retry or restart.
//!
//! ## Module Structure
//!
//! ```text
//! dt-04-transport/
//! ├── domain/       # TransferRequest, SubstrateEvent, TransportEvent, ProgressTracker
//! ├── ports/        # ChannelTransport (inbound), BlockTransport (outbound)
//! ├── adapters/     # SimulatedTransport
//! ├── service.rs    # TransportAdapter
//! └── config.rs     # TransportConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{BlockPlan, SimulatedTransport};
pub use config::TransportConfig;
pub use domain::{
    ProgressTracker, ResumePoint, SubstrateEvent, TransferOutcome, TransferRequest,
    TransportError, TransportEvent,
};
pub use ports::{BlockTransport, ChannelTransport, SubstrateSink};
pub use service::{TransportAdapter, TransportEvents};
