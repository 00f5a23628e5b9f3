//! Ports: the store API (inbound) and the key-value backend it needs (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::ChannelStateStore;
pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
