//! # Data Transfer Node Library
//!
//! Process wiring for a data-transfer node: configuration, log output,
//! storage backends and the runtime that builds a channel manager from
//! them. The `dt-node` binary is a thin shell over [`NodeRuntime`].
//!
//! ## Module Structure
//!
//! ```text
//! dt-node/
//! ├── config.rs      # NodeConfig (TOML + DT_* overrides)
//! ├── telemetry.rs   # tracing-subscriber setup
//! ├── adapters/      # RocksDbStore (feature "rocksdb"), TokenValidator
//! └── runtime.rs     # NodeRuntime
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod runtime;
pub mod telemetry;

pub use config::{ConfigError, NodeConfig, StorageBackend};
pub use runtime::{open_store, NodeError, NodeRuntime};
pub use telemetry::{init_logging, TelemetryConfig};
