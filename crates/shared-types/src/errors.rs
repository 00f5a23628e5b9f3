//! Errors shared across crates.

use thiserror::Error;

/// Failure to encode or decode a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload tagged {actual} cannot be decoded as {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("failed to decode {type_id}: {reason}")]
    Decode { type_id: String, reason: String },

    #[error("failed to encode {type_id}: {reason}")]
    Encode { type_id: String, reason: String },
}

/// Error raised by an application validator.
///
/// Any error is treated as a rejection of the request being validated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("voucher could not be interpreted: {0}")]
    InvalidVoucher(String),

    #[error("validator failure: {0}")]
    Internal(String),
}

impl From<PayloadError> for ValidationError {
    fn from(err: PayloadError) -> Self {
        ValidationError::InvalidVoucher(err.to_string())
    }
}
