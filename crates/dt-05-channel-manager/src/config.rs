//! Manager configuration.

use dt_02_channel_store::DEFAULT_NAMESPACE;
use dt_04_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What `stop()` does with channels that are still moving data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for in-flight channels to finish.
    pub drain_timeout_ms: u64,
    /// Cancel (and notify peers about) channels still running after the
    /// drain. Otherwise they stay persisted and are recovered on next start.
    pub cancel_on_shutdown: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_ms: 5_000,
            cancel_on_shutdown: false,
        }
    }
}

impl ShutdownConfig {
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataTransferConfig {
    /// Store namespace; managers sharing a key-value store need distinct ones.
    pub namespace: String,
    pub shutdown: ShutdownConfig,
    /// Log a warning when a channel has this many unprocessed commands.
    pub inbox_warning_threshold: usize,
    pub transport: TransportConfig,
}

impl Default for DataTransferConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            shutdown: ShutdownConfig::default(),
            inbox_warning_threshold: 1_024,
            transport: TransportConfig::default(),
        }
    }
}

impl DataTransferConfig {
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            shutdown: ShutdownConfig {
                drain_timeout_ms: 100,
                cancel_on_shutdown: false,
            },
            inbox_warning_threshold: 64,
            transport: TransportConfig::for_testing(),
        }
    }
}
