//! Application layer: channel actors and the manager that owns them.

mod actor;
mod context;
mod local;
mod manager;
mod remote;
#[cfg(test)]
mod test_utils;

pub use manager::{DataTransferManager, Lifecycle};
