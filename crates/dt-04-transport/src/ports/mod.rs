//! Ports: per-channel commands (inbound) and the substrate (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::ChannelTransport;
pub use outbound::{BlockTransport, SubstrateSink};
