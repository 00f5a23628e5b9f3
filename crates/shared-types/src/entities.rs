//! # Core Entities
//!
//! Identities and opaque payloads exchanged between peers.
//!
//! ## Clusters
//!
//! - **Identity**: `PeerId`, `TransferId`, `ChannelId`
//! - **Content**: `Cid`, `Selector`
//! - **Authorization**: `TypeIdentifier`, `TypedPayload`, `VoucherType`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PayloadError;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Identity of a peer on the network.
///
/// Peer identities are totally ordered; the ordering is used to break ties
/// between concurrently opened channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PeerId(pub String);

impl PeerId {
    /// Create a peer id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Sequence number assigned by the initiator of a channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TransferId(pub u64);

impl TransferId {
    /// The id following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique identity of a channel.
///
/// Immutable once created. `initiator` is the peer that sent the Open
/// request, `responder` the peer that validated it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    /// Peer that opened the channel.
    pub initiator: PeerId,
    /// Peer that received the open request.
    pub responder: PeerId,
    /// Initiator-assigned sequence number.
    pub id: TransferId,
}

impl ChannelId {
    /// Create a channel id.
    pub fn new(initiator: PeerId, responder: PeerId, id: TransferId) -> Self {
        Self {
            initiator,
            responder,
            id,
        }
    }

    /// The participant that is not `me`, or `None` if `me` is not a participant.
    #[must_use]
    pub fn other_party(&self, me: &PeerId) -> Option<&PeerId> {
        if &self.initiator == me {
            Some(&self.responder)
        } else if &self.responder == me {
            Some(&self.initiator)
        } else {
            None
        }
    }

    /// Whether `peer` takes part in this channel.
    #[must_use]
    pub fn involves(&self, peer: &PeerId) -> bool {
        &self.initiator == peer || &self.responder == peer
    }

    /// Deterministic precedence between two competing channels.
    ///
    /// The lower sequence number wins; equal sequence numbers fall back to the
    /// lower initiator identity. Both peers evaluate this identically.
    #[must_use]
    pub fn precedes(&self, other: &ChannelId) -> bool {
        (self.id, &self.initiator, &self.responder) < (other.id, &other.initiator, &other.responder)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.initiator, self.responder, self.id)
    }
}

/// Direction of data flow relative to the initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The initiator sends data.
    Push,
    /// The initiator receives data.
    Pull,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => f.write_str("push"),
            Direction::Pull => f.write_str("pull"),
        }
    }
}

/// Role of the local peer on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// We opened the channel.
    Requester,
    /// The remote peer opened the channel.
    Responder,
}

// =============================================================================
// CLUSTER B: CONTENT
// =============================================================================

/// Content identifier of the root of the data graph.
///
/// Opaque to this workspace; the transport substrate interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Cid(pub String);

impl Cid {
    /// Create a content identifier.
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque specification of which part of the graph to transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Selector(pub Vec<u8>);

impl Selector {
    /// Selector that matches the whole graph below the root.
    ///
    /// The substrate owns the real semantics; this is just a well-known value.
    #[must_use]
    pub fn all() -> Self {
        Self(b"*".to_vec())
    }

    /// Raw selector bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// CLUSTER C: AUTHORIZATION PAYLOADS
// =============================================================================

/// Tag naming a registered voucher or voucher-result type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TypeIdentifier(pub String);

impl TypeIdentifier {
    /// Create a type identifier.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Borrow the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Application type that can travel as a voucher or voucher result.
///
/// The tag must be unique per manager; it is what the registry keys on.
pub trait VoucherType: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Registry tag for this type.
    const TYPE: &'static str;

    /// Tag as a [`TypeIdentifier`].
    fn type_identifier() -> TypeIdentifier {
        TypeIdentifier::new(Self::TYPE)
    }
}

/// A type-tagged opaque payload.
///
/// The tag selects the registered codec; `data` is the encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypedPayload {
    /// Registered type tag.
    pub type_id: TypeIdentifier,
    /// Encoded payload.
    pub data: Vec<u8>,
}

/// Authorization payload attached to a channel.
pub type Voucher = TypedPayload;

/// Payload returned by the validator alongside its verdict.
pub type VoucherResult = TypedPayload;

impl TypedPayload {
    /// Wrap already-encoded bytes under a tag.
    pub fn new(type_id: impl Into<TypeIdentifier>, data: Vec<u8>) -> Self {
        Self {
            type_id: type_id.into(),
            data,
        }
    }

    /// Encode a typed value with the workspace's default (bincode) encoding.
    pub fn from_typed<T: VoucherType>(value: &T) -> Result<Self, PayloadError> {
        let data = bincode::serialize(value).map_err(|e| PayloadError::Encode {
            type_id: T::TYPE.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            type_id: T::type_identifier(),
            data,
        })
    }

    /// Decode the payload as `T`, checking the tag first.
    pub fn decode_as<T: VoucherType>(&self) -> Result<T, PayloadError> {
        if self.type_id.as_str() != T::TYPE {
            return Err(PayloadError::TypeMismatch {
                expected: T::TYPE.to_string(),
                actual: self.type_id.to_string(),
            });
        }
        bincode::deserialize(&self.data).map_err(|e| PayloadError::Decode {
            type_id: self.type_id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<String> for TypeIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}
