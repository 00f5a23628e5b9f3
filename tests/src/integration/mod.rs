//! End-to-end channel scenarios.

#[cfg(test)]
pub(crate) mod harness;

pub mod concurrency;
pub mod negotiation;
pub mod pause_resume;
pub mod protocol_errors;
pub mod recovery;
pub mod restart;
