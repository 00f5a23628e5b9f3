//! # DT-05 Channel Manager
//!
//! The data-transfer state machine and the API applications use.
//!
//! **Subsystem ID:** 5
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Negotiates, authorizes, drives and persists channels: bulk exchanges of a
//! content-addressed graph between two peers. Each channel runs as its own
//! actor; the manager routes local calls, peer messages and transport
//! events to it.
//!
//! ## Channel Lifecycle
//!
//! ```text
//! new ─► open ─► accepted ─► transferring ⇄ paused ─► completing ─► completed
//!          │         │              │                      │
//!          ▼         └──────────────┴──► failed ◄──────────┘
//!       rejected            restarting ◄──┘   (restartable)
//!
//!        any non-terminal status ─► cancelled
//! ```
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Transitions only follow the table | `domain::transitions::can_transition` checked on every commit |
//! | Store is the source of truth | write-ahead: persist, then publish |
//! | No cross-channel blocking | one actor per channel, no global lock during a transition |
//! | Counters never regress | progress deltas only, replay suppressed by the transport adapter |
//! | Concurrent opens converge | lower `(id, initiator)` wins on both peers |
//!
//! ## Module Structure
//!
//! ```text
//! dt-05-channel-manager/
//! ├── domain/        # transition table, DataTransferError
//! ├── ports/         # DataTransferApi (inbound), RequestValidator (outbound)
//! ├── adapters/      # AcceptAllValidator
//! ├── application/   # channel actors, DataTransferManager
//! └── config.rs      # DataTransferConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::AcceptAllValidator;
pub use application::{DataTransferManager, Lifecycle};
pub use config::{DataTransferConfig, ShutdownConfig};
pub use domain::{can_transition, DataTransferError, DataTransferResult};
pub use ports::{DataTransferApi, RequestValidator};
