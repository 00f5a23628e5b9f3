//! Ports: the network API (inbound) and the stream host it drives (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::{DataTransferNetwork, MessageReceiver};
pub use outbound::{BoxedStream, PeerStream, StreamHost};
