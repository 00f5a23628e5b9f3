//! # Outbound Ports (Driven Ports)
//!
//! What the network layer needs from the peer-to-peer host: ordered,
//! reliable byte streams to and from identified peers.

use crate::domain::errors::NetworkError;
use async_trait::async_trait;
use shared_types::PeerId;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream.
pub trait PeerStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> PeerStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Boxed stream handed out by a host.
pub type BoxedStream = Box<dyn PeerStream>;

/// Connection establishment and peer identity.
///
/// Production: a libp2p-style host. Testing: `MemoryHost`. Also: `TcpHost`.
#[async_trait]
pub trait StreamHost: Send + Sync + 'static {
    /// Identity of this node.
    fn local_peer(&self) -> PeerId;

    /// Open a new outbound stream to `peer`.
    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream, NetworkError>;

    /// Wait for the next inbound stream. `None` once the host is closed.
    async fn accept(&self) -> Option<(PeerId, BoxedStream)>;
}
