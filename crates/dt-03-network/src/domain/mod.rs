//! Domain layer: protocol messages, wire codec, errors.

pub mod codec;
pub mod errors;
pub mod message;

pub use codec::{MessageCodec, WireEnvelope, DEFAULT_MAX_FRAME_SIZE, WIRE_VERSION};
pub use errors::NetworkError;
pub use message::{ErrorCode, TransferMessage};
