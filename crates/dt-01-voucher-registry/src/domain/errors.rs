//! Registry errors.

use shared_types::TypeIdentifier;
use thiserror::Error;

/// Errors raised by the voucher registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The tag already has a codec. The existing entry is kept.
    #[error("voucher type already registered: {0}")]
    DuplicateType(TypeIdentifier),

    #[error("unknown voucher type: {0}")]
    UnknownType(TypeIdentifier),

    #[error("failed to decode {type_id}: {reason}")]
    Decode {
        type_id: TypeIdentifier,
        reason: String,
    },

    #[error("failed to encode {type_id}: {reason}")]
    Encode {
        type_id: TypeIdentifier,
        reason: String,
    },
}

impl RegistryError {
    /// Whether the error concerns the payload bytes rather than the registry.
    #[must_use]
    pub fn is_payload_error(&self) -> bool {
        matches!(self, RegistryError::Decode { .. } | RegistryError::Encode { .. })
    }
}
