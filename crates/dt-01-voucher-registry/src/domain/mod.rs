//! Domain layer: codecs and errors.

pub mod codec;
pub mod errors;

pub use codec::{BincodeCodec, JsonCodec, VoucherCodec};
pub use errors::RegistryError;
