//! # In-Memory Host
//!
//! Peers in one process connected by `tokio::io::duplex` pipes. A shared
//! [`MemoryNetwork`] plays the role of the swarm: it routes new streams to
//! the target peer's accept queue.

use crate::domain::errors::NetworkError;
use crate::ports::outbound::{BoxedStream, StreamHost};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Buffer size of each in-memory pipe.
const PIPE_CAPACITY: usize = 256 * 1024;

type Incoming = (PeerId, BoxedStream);

/// Routing table shared by all in-memory hosts.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    peers: Arc<RwLock<HashMap<PeerId, mpsc::UnboundedSender<Incoming>>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a host for `peer`. Re-attaching replaces the previous host.
    pub fn host(&self, peer: impl Into<PeerId>) -> MemoryHost {
        let peer = peer.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.write().insert(peer.clone(), tx);
        debug!(peer = %peer, "Memory host attached");
        MemoryHost {
            peer,
            network: self.clone(),
            incoming: Mutex::new(rx),
        }
    }

    /// Detach `peer`; new streams to it fail until it is re-attached.
    pub fn disconnect(&self, peer: &PeerId) {
        self.peers.write().remove(peer);
        debug!(peer = %peer, "Memory host detached");
    }

    #[must_use]
    pub fn is_attached(&self, peer: &PeerId) -> bool {
        self.peers.read().contains_key(peer)
    }
}

/// One peer's view of a [`MemoryNetwork`].
pub struct MemoryHost {
    peer: PeerId,
    network: MemoryNetwork,
    incoming: Mutex<mpsc::UnboundedReceiver<Incoming>>,
}

impl MemoryHost {
    /// The network this host is attached to.
    #[must_use]
    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }
}

#[async_trait]
impl StreamHost for MemoryHost {
    fn local_peer(&self) -> PeerId {
        self.peer.clone()
    }

    async fn open_stream(&self, peer: &PeerId) -> Result<BoxedStream, NetworkError> {
        let target = self
            .network
            .peers
            .read()
            .get(peer)
            .cloned()
            .ok_or_else(|| NetworkError::PeerUnreachable(peer.clone()))?;

        let (near, far) = tokio::io::duplex(PIPE_CAPACITY);
        target
            .send((self.peer.clone(), Box::new(far)))
            .map_err(|_| NetworkError::PeerUnreachable(peer.clone()))?;
        Ok(Box::new(near))
    }

    async fn accept(&self) -> Option<(PeerId, BoxedStream)> {
        self.incoming.lock().await.recv().await
    }
}
