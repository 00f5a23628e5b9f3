//! Substrates shipped with the crate.

pub mod simulated;

pub use simulated::{BlockPlan, SimulatedTransport};
