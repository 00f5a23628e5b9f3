//! # Channel Records
//!
//! On-disk layout of one channel:
//!
//! ```text
//! ┌─────────┬──────────────┬──────────────────────────────┐
//! │ version │ crc32 (LE)   │ bincode(ChannelState)        │
//! │ 1 byte  │ 4 bytes      │ variable                     │
//! └─────────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! The checksum covers the payload only.

use super::errors::StoreError;
use shared_types::{ChannelId, PeerId};

/// Current record layout version.
pub const RECORD_VERSION: u8 = 1;

const HEADER_LEN: usize = 5;

/// Serialize a channel into a record.
pub fn encode_record(state: &shared_types::ChannelState) -> Result<Vec<u8>, StoreError> {
    let payload = bincode::serialize(state).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let checksum = crc32fast::hash(&payload);

    let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
    record.push(RECORD_VERSION);
    record.extend_from_slice(&checksum.to_le_bytes());
    record.extend_from_slice(&payload);
    Ok(record)
}

/// Parse and verify a record read from `key`.
pub fn decode_record(key: &str, record: &[u8]) -> Result<shared_types::ChannelState, StoreError> {
    if record.len() < HEADER_LEN {
        return Err(StoreError::DataCorruption {
            key: key.to_string(),
            reason: format!("record truncated to {} bytes", record.len()),
        });
    }

    let version = record[0];
    if version != RECORD_VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }

    let expected = u32::from_le_bytes([record[1], record[2], record[3], record[4]]);
    let payload = &record[HEADER_LEN..];
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(StoreError::DataCorruption {
            key: key.to_string(),
            reason: format!("checksum mismatch: expected {expected:08x}, got {actual:08x}"),
        });
    }

    bincode::deserialize(payload).map_err(|e| StoreError::DataCorruption {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// KEYS
// =============================================================================

/// Escape a peer id so it is safe as one path segment.
fn escape_segment(peer: &PeerId) -> String {
    peer.as_str().replace('%', "%25").replace('/', "%2F")
}

/// Prefix shared by every channel record in a namespace.
#[must_use]
pub fn channels_prefix(namespace: &str) -> String {
    format!("/{namespace}/datatransfer/channels/")
}

/// Prefix of every channel opened by `initiator`.
#[must_use]
pub fn initiator_prefix(namespace: &str, initiator: &PeerId) -> String {
    format!("{}{}/", channels_prefix(namespace), escape_segment(initiator))
}

/// Full record key for a channel.
#[must_use]
pub fn channel_key(namespace: &str, id: &ChannelId) -> String {
    format!(
        "{}{}/{:020}",
        initiator_prefix(namespace, &id.initiator),
        escape_segment(&id.responder),
        id.id.0
    )
}

/// Transfer id encoded in the last key segment.
#[must_use]
pub fn transfer_id_from_key(key: &str) -> Option<u64> {
    key.rsplit('/').next()?.parse().ok()
}
