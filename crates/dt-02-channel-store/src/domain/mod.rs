//! Domain layer: record format and errors.

pub mod errors;
pub mod record;

pub use errors::{KVStoreError, StoreError};
pub use record::{channel_key, decode_record, encode_record, RECORD_VERSION};
