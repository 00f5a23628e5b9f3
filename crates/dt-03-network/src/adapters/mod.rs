//! Stream hosts shipped with the crate.

pub mod memory;
#[cfg(feature = "tcp")]
pub mod tcp;

pub use memory::{MemoryHost, MemoryNetwork};
#[cfg(feature = "tcp")]
pub use tcp::TcpHost;
