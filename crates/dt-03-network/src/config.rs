//! Network configuration.

use crate::domain::codec::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::StreamNetwork`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Largest accepted frame payload in bytes.
    pub max_frame_size: usize,
    /// Attempts per send, including the first, before giving up.
    pub max_send_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub send_backoff_ms: u64,
    /// How long a TCP peer has to send its hello frame.
    pub hello_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_send_attempts: 3,
            send_backoff_ms: 100,
            hello_timeout_ms: 5_000,
        }
    }
}

impl NetworkConfig {
    /// Fast retries for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_send_attempts: 2,
            send_backoff_ms: 5,
            hello_timeout_ms: 500,
        }
    }

    /// Backoff before attempt number `attempt` (1-based, first retry is 2).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(2).min(16);
        Duration::from_millis(self.send_backoff_ms.saturating_mul(1 << exp))
    }

    #[must_use]
    pub fn hello_timeout(&self) -> Duration {
        Duration::from_millis(self.hello_timeout_ms)
    }
}
