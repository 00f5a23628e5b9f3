//! # TCP Host
//!
//! Plain TCP with a static address book. The first frame on every stream is
//! a hello carrying the opener's peer id:
//!
//! ```text
//! ┌──────────────────┬──────────────────────┐
//! │ length (u16, BE) │ peer id (utf-8)      │
//! └──────────────────┴──────────────────────┘
//! ```
//!
//! No authentication: the hello is trusted. Suitable for demos and closed
//! networks only.

use crate::domain::errors::NetworkError;
use crate::ports::outbound::{BoxedStream, StreamHost};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::PeerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

const MAX_PEER_ID_LEN: usize = 1024;

/// TCP implementation of [`StreamHost`].
pub struct TcpHost {
    peer: PeerId,
    listener: TcpListener,
    address_book: RwLock<HashMap<PeerId, SocketAddr>>,
    hello_timeout: Duration,
}

impl TcpHost {
    /// Bind a listener for `peer` on `listen_addr`.
    pub async fn bind(
        peer: PeerId,
        listen_addr: SocketAddr,
        hello_timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(listen_addr).await.map_err(|e| {
            NetworkError::Io(format!("failed to bind {listen_addr}: {e}"))
        })?;
        info!(peer = %peer, addr = %listener.local_addr()?, "TCP host listening");
        Ok(Self {
            peer,
            listener,
            address_book: RwLock::new(HashMap::new()),
            hello_timeout,
        })
    }

    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        Ok(self.listener.local_addr()?)
    }

    /// Record where `peer` can be reached.
    pub fn add_peer(&self, peer: PeerId, addr: SocketAddr) {
        debug!(peer = %peer, addr = %addr, "Peer address added");
        self.address_book.write().insert(peer, addr);
    }

    async fn read_hello(&self, stream: &mut TcpStream) -> Result<PeerId, NetworkError> {
        let read = async {
            let len = stream.read_u16().await? as usize;
            if len == 0 || len > MAX_PEER_ID_LEN {
                return Err(NetworkError::Decode(format!("invalid hello length {len}")));
            }
            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).await?;
            let id = String::from_utf8(buf)
                .map_err(|e| NetworkError::Decode(format!("hello is not utf-8: {e}")))?;
            Ok(PeerId::new(id))
        };
        timeout(self.hello_timeout, read)
            .await
            .map_err(|_| NetworkError::Decode("hello timed out".to_string()))?
    }
}

#[async_trait]
impl StreamHost for TcpHost {
    fn local_peer(&self) -> PeerId {
        self.peer.clone()
    }

    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream, NetworkError> {
        let addr = self
            .address_book
            .read()
            .get(peer)
            .copied()
            .ok_or_else(|| NetworkError::PeerUnreachable(peer.clone()))?;

        let mut stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let id = self.peer.as_str().as_bytes();
        let len = u16::try_from(id.len())
            .map_err(|_| NetworkError::Encode("local peer id too long".to_string()))?;
        stream.write_u16(len).await?;
        stream.write_all(id).await?;
        stream.flush().await?;

        debug!(peer = %peer, addr = %addr, "TCP stream opened");
        Ok(Box::new(stream))
    }

    async fn accept(&self) -> Option<(PeerId, BoxedStream)> {
        loop {
            let (mut stream, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "TCP accept failed");
                    return None;
                }
            };
            match self.read_hello(&mut stream).await {
                Ok(peer) => {
                    debug!(peer = %peer, addr = %addr, "TCP stream accepted");
                    return Some((peer, Box::new(stream)));
                }
                Err(e) => warn!(addr = %addr, error = %e, "Dropping TCP stream with bad hello"),
            }
        }
    }
}
