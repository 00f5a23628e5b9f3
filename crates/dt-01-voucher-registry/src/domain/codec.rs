//! # Voucher Codecs
//!
//! A codec translates between the wire form of a voucher and its in-memory
//! form. In memory every payload is the bincode encoding of the application
//! type, which is what [`shared_types::TypedPayload::decode_as`] expects.
//! The wire form is codec-specific.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Translates one voucher type between wire and in-memory bytes.
///
/// Implementations must be pure: the same input always yields the same
/// output, so any actor can call them concurrently.
pub trait VoucherCodec: Send + Sync + 'static {
    /// Wire bytes to in-memory bytes.
    fn decode(&self, wire: &[u8]) -> Result<Vec<u8>, String>;

    /// In-memory bytes to wire bytes.
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, String>;
}

/// Wire form is bincode, identical to the in-memory form.
///
/// Decoding still round-trips through `T` so malformed bytes are caught at
/// the registry instead of inside a validator.
pub struct BincodeCodec<T>(PhantomData<fn() -> T>);

impl<T> BincodeCodec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VoucherCodec for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn decode(&self, wire: &[u8]) -> Result<Vec<u8>, String> {
        let value: T = bincode::deserialize(wire).map_err(|e| e.to_string())?;
        bincode::serialize(&value).map_err(|e| e.to_string())
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let value: T = bincode::deserialize(data).map_err(|e| e.to_string())?;
        bincode::serialize(&value).map_err(|e| e.to_string())
    }
}

/// Wire form is JSON.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VoucherCodec for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn decode(&self, wire: &[u8]) -> Result<Vec<u8>, String> {
        let value: T = serde_json::from_slice(wire).map_err(|e| e.to_string())?;
        bincode::serialize(&value).map_err(|e| e.to_string())
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        let value: T = bincode::deserialize(data).map_err(|e| e.to_string())?;
        serde_json::to_vec(&value).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        data: String,
    }

    #[test]
    fn test_json_wire_form() {
        let codec = JsonCodec::<Ticket>::new();
        let data = bincode::serialize(&Ticket {
            data: "hello".into(),
        })
        .unwrap();

        let wire = codec.encode(&data).unwrap();
        assert_eq!(wire, br#"{"data":"hello"}"#);
        assert_eq!(codec.decode(&wire).unwrap(), data);
    }

    #[test]
    fn test_bincode_rejects_garbage() {
        let codec = BincodeCodec::<Ticket>::new();
        assert!(codec.decode(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_json_rejects_wrong_shape() {
        let codec = JsonCodec::<Ticket>::new();
        assert!(codec.decode(br#"{"other":1}"#).is_err());
    }
}
