//! Ports: the application API (inbound) and the validator (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::DataTransferApi;
pub use outbound::RequestValidator;
