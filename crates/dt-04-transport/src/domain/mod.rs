//! Domain layer: transfer types, replay suppression, errors.

pub mod errors;
pub mod progress;
pub mod types;

pub use errors::TransportError;
pub use progress::ProgressTracker;
pub use types::{
    ResumePoint, SubstrateEvent, TransferOutcome, TransferRequest, TransportEvent,
};
