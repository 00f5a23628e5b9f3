//! Validator verdicts.

use serde::{Deserialize, Serialize};

use crate::entities::VoucherResult;

/// Outcome of validating an open, restart or voucher.
///
/// Immutable once returned by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub accepted: bool,
    pub voucher_result: Option<VoucherResult>,
    /// Accept, but hold the transfer until a further voucher arrives.
    pub for_pause: bool,
    /// Maximum bytes to send before pausing for another voucher.
    pub data_limit: Option<u64>,
}

impl ValidationResult {
    #[must_use]
    pub fn accept() -> Self {
        Self {
            accepted: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn reject() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_result(mut self, result: VoucherResult) -> Self {
        self.voucher_result = Some(result);
        self
    }

    #[must_use]
    pub fn paused(mut self) -> Self {
        self.for_pause = true;
        self
    }

    #[must_use]
    pub fn with_data_limit(mut self, limit: u64) -> Self {
        self.data_limit = Some(limit);
        self
    }
}
