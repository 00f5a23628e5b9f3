//! # Inbound Ports (Driving Ports)
//!
//! The API the channel manager uses to talk to peers, and the callback it
//! implements to hear from them.

use crate::domain::errors::NetworkError;
use crate::domain::message::TransferMessage;
use async_trait::async_trait;
use shared_types::PeerId;
use std::sync::Arc;

/// Receives decoded messages from peers.
///
/// Implementations must hand messages off without waiting on protocol work;
/// the network calls this from its stream readers.
#[async_trait]
pub trait MessageReceiver: Send + Sync + 'static {
    /// A well-formed message arrived from `from`.
    async fn receive_message(&self, from: PeerId, message: TransferMessage);

    /// A stream from `from` failed; it has been closed.
    async fn receive_error(&self, from: PeerId, error: NetworkError);
}

/// Sends and receives data-transfer protocol messages.
#[async_trait]
pub trait DataTransferNetwork: Send + Sync + 'static {
    /// Identity of this node.
    fn local_peer(&self) -> PeerId;

    /// Deliver a message to `peer`. Messages to one peer arrive in send order.
    async fn send_message(&self, peer: &PeerId, message: TransferMessage)
        -> Result<(), NetworkError>;

    /// Begin accepting inbound streams, delivering to `receiver`.
    async fn start(&self, receiver: Arc<dyn MessageReceiver>) -> Result<(), NetworkError>;

    /// Stop accepting and drop every cached stream.
    async fn stop(&self);
}
