//! # Adapters
//!
//! Node-side implementations of subsystem ports.

pub mod storage;
pub mod validator;

#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
pub use validator::{DemoVoucher, TokenValidator};
