//! # Node Configuration
//!
//! One TOML file plus `DT_*` environment overrides.
//!
//! ```toml
//! peer_id = "provider"
//! listen_addr = "127.0.0.1:7400"
//!
//! [[peers]]
//! peer_id = "requester"
//! addr = "127.0.0.1:7401"
//!
//! [storage]
//! backend = "rocksdb"
//! data_dir = "./data/provider"
//!
//! [substrate]
//! block_size = 262144
//! blocks = 16
//! interval_ms = 50
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DT_PEER_ID` | `peer_id` |
//! | `DT_LISTEN_ADDR` | `listen_addr` |
//! | `DT_PEERS` | `peers`, as `id=host:port,id=host:port` |
//! | `DT_DATA_DIR` | `storage.data_dir` |
//! | `DT_STORAGE_BACKEND` | `storage.backend` (`memory` or `rocksdb`) |
//! | `DT_ACCEPT_TOKEN` | `accept_token` |

use dt_03_network::NetworkConfig;
use dt_05_channel_manager::DataTransferConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("invalid config file: {0}")]
    Parse(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("peer_id must not be empty")]
    MissingPeerId,

    #[error("storage backend {0} is not compiled in (enable the \"{0}\" feature)")]
    BackendUnavailable(&'static str),
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity announced to peers.
    pub peer_id: String,
    /// TCP listen address.
    pub listen_addr: SocketAddr,
    /// Static address book.
    pub peers: Vec<PeerAddress>,
    pub storage: StorageConfig,
    pub substrate: SubstrateConfig,
    /// Channels the node opens once it is running.
    pub requests: Vec<DemoRequest>,
    /// Token inbound demo vouchers must carry. Unset accepts any token.
    pub accept_token: Option<String>,
    pub network: NetworkConfig,
    pub transfer: DataTransferConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            peer_id: "dt-node".to_string(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7400)),
            peers: Vec::new(),
            storage: StorageConfig::default(),
            substrate: SubstrateConfig::default(),
            requests: Vec::new(),
            accept_token: None,
            network: NetworkConfig::default(),
            transfer: DataTransferConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub peer_id: String,
    pub addr: SocketAddr,
}

/// Key-value backend for channel records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lost on exit.
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::RocksDb),
            _ => Err(ConfigError::InvalidValue {
                key: "DT_STORAGE_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory for the RocksDB backend.
    pub data_dir: PathBuf,
    /// fsync every write.
    pub sync_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
            sync_writes: true,
        }
    }
}

/// Shape of the simulated block stream every channel plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateConfig {
    pub block_size: u64,
    pub blocks: u64,
    pub interval_ms: u64,
}

impl Default for SubstrateConfig {
    fn default() -> Self {
        Self {
            block_size: 256 * 1024,
            blocks: 16,
            interval_ms: 50,
        }
    }
}

/// A pull or push the node starts on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoRequest {
    pub peer_id: String,
    pub cid: String,
    #[serde(default)]
    pub push: bool,
    /// Sent in the demo voucher; the provider checks it.
    #[serde(default)]
    pub token: String,
}

impl NodeConfig {
    /// Read `path` (if given), then apply `DT_*` overrides from the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(peer_id) = lookup("DT_PEER_ID") {
            self.peer_id = peer_id;
        }
        if let Some(addr) = lookup("DT_LISTEN_ADDR") {
            self.listen_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DT_LISTEN_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(peers) = lookup("DT_PEERS") {
            self.peers = parse_peer_list(&peers)?;
        }
        if let Some(dir) = lookup("DT_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup("DT_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(token) = lookup("DT_ACCEPT_TOKEN") {
            self.accept_token = Some(token);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_id.trim().is_empty() {
            return Err(ConfigError::MissingPeerId);
        }
        if self.storage.backend == StorageBackend::RocksDb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::BackendUnavailable("rocksdb"));
        }
        Ok(())
    }
}

fn parse_peer_list(raw: &str) -> Result<Vec<PeerAddress>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidValue {
                key: "DT_PEERS",
                value: entry.to_string(),
            };
            let (peer_id, addr) = entry.split_once('=').ok_or_else(invalid)?;
            if peer_id.is_empty() {
                return Err(invalid());
            }
            Ok(PeerAddress {
                peer_id: peer_id.to_string(),
                addr: addr.parse().map_err(|_| invalid())?,
            })
        })
        .collect()
}
