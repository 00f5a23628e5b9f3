//! # Channel Store Service
//!
//! Implements [`ChannelStateStore`] on top of any [`KeyValueStore`].

use crate::domain::errors::StoreError;
use crate::domain::record::{
    channel_key, channels_prefix, decode_record, encode_record, initiator_prefix,
    transfer_id_from_key,
};
use crate::ports::inbound::ChannelStateStore;
use crate::ports::outbound::KeyValueStore;
use shared_types::{ChannelId, ChannelState, ChannelStatus, PeerId, TransferId};
use std::sync::Arc;
use tracing::{error, trace};

/// Default namespace for channel records.
pub const DEFAULT_NAMESPACE: &str = "dt";

/// Channel state store.
///
/// Stateless apart from the backend handle: every call goes to the
/// key-value store, so concurrent actors only contend inside the backend.
pub struct ChannelStore {
    kv: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl ChannelStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: impl Into<String>) -> Self {
        Self {
            kv,
            namespace: namespace.into(),
        }
    }

    /// Store under [`DEFAULT_NAMESPACE`].
    pub fn with_default_namespace(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(kv, DEFAULT_NAMESPACE)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decode every record under `prefix`.
    ///
    /// Corrupt records are logged and skipped so one bad record cannot hide
    /// every other channel.
    fn scan(&self, prefix: &str) -> Result<Vec<ChannelState>, StoreError> {
        let entries = self.kv.prefix_scan(prefix.as_bytes())?;
        let mut states = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = String::from_utf8_lossy(&key);
            match decode_record(&key, &value) {
                Ok(state) => states.push(state),
                Err(e) => error!(key = %key, error = %e, "Skipping unreadable channel record"),
            }
        }
        Ok(states)
    }
}

impl ChannelStateStore for ChannelStore {
    fn put(&self, state: &ChannelState) -> Result<(), StoreError> {
        let key = channel_key(&self.namespace, &state.channel_id);
        let record = encode_record(state)?;
        self.kv.put(key.as_bytes(), &record)?;
        trace!(
            channel_id = %state.channel_id,
            status = %state.status,
            bytes = record.len(),
            "Channel record written"
        );
        Ok(())
    }

    fn get(&self, id: &ChannelId) -> Result<ChannelState, StoreError> {
        let key = channel_key(&self.namespace, id);
        let record = self
            .kv
            .get(key.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        decode_record(&key, &record)
    }

    fn list_by_status(&self, status: ChannelStatus) -> Result<Vec<ChannelState>, StoreError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|state| state.status == status)
            .collect())
    }

    fn list_all(&self) -> Result<Vec<ChannelState>, StoreError> {
        self.scan(&channels_prefix(&self.namespace))
    }

    fn highest_transfer_id(&self, initiator: &PeerId) -> Result<Option<TransferId>, StoreError> {
        let prefix = initiator_prefix(&self.namespace, initiator);
        let entries = self.kv.prefix_scan(prefix.as_bytes())?;
        Ok(entries
            .iter()
            .filter_map(|(key, _)| transfer_id_from_key(&String::from_utf8_lossy(key)))
            .max()
            .map(TransferId))
    }
}
