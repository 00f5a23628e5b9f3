//! Backend adapters shipped with the crate.

pub mod memory;

pub use memory::InMemoryKVStore;
