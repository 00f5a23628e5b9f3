//! # DT-02 Channel State Store
//!
//! Durable record of every channel, keyed by `ChannelId`.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! The store is the source of truth for channel state. Every transition is
//! written here before its event is published, and manager start-up rebuilds
//! its channel actors from what this store returns.
//!
//! ## Record Integrity
//!
//! | Check | Failure |
//! |-------|---------|
//! | Record shorter than its header | `DataCorruption` |
//! | Unknown layout version | `UnsupportedVersion` |
//! | CRC32 mismatch | `DataCorruption` |
//! | Payload does not decode | `DataCorruption` |
//!
//! ## Module Structure
//!
//! ```text
//! dt-02-channel-store/
//! ├── domain/      # Record layout, key scheme, errors
//! ├── ports/       # ChannelStateStore (inbound), KeyValueStore (outbound)
//! ├── adapters/    # InMemoryKVStore
//! └── service.rs   # ChannelStore
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryKVStore;
pub use domain::{KVStoreError, StoreError};
pub use ports::{BatchOperation, ChannelStateStore, KeyValueStore, ScanResult};
pub use service::{ChannelStore, DEFAULT_NAMESPACE};
