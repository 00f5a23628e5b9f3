//! Domain layer: the transition table and the manager error type.

pub mod errors;
pub mod transitions;

pub use errors::{DataTransferError, DataTransferResult};
pub use transitions::{can_transition, legal_targets, unpaused_status};
