//! # Voucher Registry
//!
//! Side table from type tag to codec. Reads take a shared lock so any
//! channel actor can decode concurrently; registration takes the write lock
//! briefly.

use crate::domain::{BincodeCodec, RegistryError, VoucherCodec};
use parking_lot::RwLock;
use shared_types::{TypeIdentifier, TypedPayload, VoucherType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of voucher (or voucher-result) types.
pub struct VoucherRegistry {
    /// Label used in logs ("voucher", "voucher-result").
    kind: &'static str,
    entries: RwLock<HashMap<TypeIdentifier, Arc<dyn VoucherCodec>>>,
}

impl VoucherRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a codec for `type_id`.
    ///
    /// Fails with `DuplicateType` if the tag is taken; the existing codec
    /// stays in place.
    pub fn register(
        &self,
        type_id: impl Into<TypeIdentifier>,
        codec: impl VoucherCodec,
    ) -> Result<(), RegistryError> {
        let type_id = type_id.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&type_id) {
            return Err(RegistryError::DuplicateType(type_id));
        }
        debug!(kind = self.kind, type_id = %type_id, "Registered type");
        entries.insert(type_id, Arc::new(codec));
        Ok(())
    }

    /// Register `T` under its own tag with the bincode wire form.
    pub fn register_type<T: VoucherType>(&self) -> Result<(), RegistryError> {
        self.register(T::type_identifier(), BincodeCodec::<T>::new())
    }

    /// Decode wire bytes received from a peer.
    pub fn decode(
        &self,
        type_id: &TypeIdentifier,
        wire: &[u8],
    ) -> Result<TypedPayload, RegistryError> {
        let codec = self.codec(type_id)?;
        let data = codec.decode(wire).map_err(|reason| RegistryError::Decode {
            type_id: type_id.clone(),
            reason,
        })?;
        Ok(TypedPayload {
            type_id: type_id.clone(),
            data,
        })
    }

    /// Encode a payload for the wire.
    pub fn encode(&self, payload: &TypedPayload) -> Result<Vec<u8>, RegistryError> {
        let codec = self.codec(&payload.type_id)?;
        codec
            .encode(&payload.data)
            .map_err(|reason| RegistryError::Encode {
                type_id: payload.type_id.clone(),
                reason,
            })
    }

    #[must_use]
    pub fn is_registered(&self, type_id: &TypeIdentifier) -> bool {
        self.entries.read().contains_key(type_id)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<TypeIdentifier> {
        let mut types: Vec<_> = self.entries.read().keys().cloned().collect();
        types.sort();
        types
    }

    fn codec(&self, type_id: &TypeIdentifier) -> Result<Arc<dyn VoucherCodec>, RegistryError> {
        self.entries
            .read()
            .get(type_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(type_id.clone()))
    }
}

impl Default for VoucherRegistry {
    fn default() -> Self {
        Self::new("voucher")
    }
}
