//! Adapters shipped with the crate.

pub mod validators;

pub use validators::AcceptAllValidator;
