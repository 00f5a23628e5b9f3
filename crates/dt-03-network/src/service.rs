//! # Stream Network
//!
//! [`DataTransferNetwork`] over any [`StreamHost`].
//!
//! ```text
//!  send_message(peer) ──► cached outbound stream ──► FramedWrite ──► host
//!
//!  host.accept() ──► reader task per stream ──► FramedRead ──► MessageReceiver
//! ```
//!
//! Outbound streams are write-only and inbound streams read-only: a reply
//! travels on the replier's own outbound stream. One outbound stream is kept
//! per peer, which gives per-peer ordering.

use crate::config::NetworkConfig;
use crate::domain::codec::MessageCodec;
use crate::domain::errors::NetworkError;
use crate::domain::message::TransferMessage;
use crate::ports::inbound::{DataTransferNetwork, MessageReceiver};
use crate::ports::outbound::{BoxedStream, StreamHost};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use shared_types::PeerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

type Writer = Arc<tokio::sync::Mutex<FramedWrite<BoxedStream, MessageCodec>>>;

/// Stream-based network for data-transfer messages.
pub struct StreamNetwork<H: StreamHost> {
    host: Arc<H>,
    config: NetworkConfig,
    outbound: Mutex<HashMap<PeerId, Writer>>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl<H: StreamHost> StreamNetwork<H> {
    pub fn new(host: H, config: NetworkConfig) -> Self {
        Self::from_arc(Arc::new(host), config)
    }

    pub fn from_arc(host: Arc<H>, config: NetworkConfig) -> Self {
        Self {
            host,
            config,
            outbound: Mutex::new(HashMap::new()),
            tasks: Arc::new(Mutex::new(Vec::new())),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    #[must_use]
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Number of cached outbound streams.
    #[must_use]
    pub fn outbound_stream_count(&self) -> usize {
        self.outbound.lock().len()
    }

    async fn writer_for(&self, peer: &PeerId) -> Result<Writer, NetworkError> {
        if let Some(writer) = self.outbound.lock().get(peer) {
            return Ok(writer.clone());
        }

        let stream = self.host.open_stream(peer).await?;
        let fresh: Writer = Arc::new(tokio::sync::Mutex::new(FramedWrite::new(
            stream,
            MessageCodec::new(self.config.max_frame_size),
        )));

        // A concurrent send may have opened one meanwhile; keep the first.
        let mut outbound = self.outbound.lock();
        let writer = outbound.entry(peer.clone()).or_insert(fresh).clone();
        debug!(peer = %peer, "Outbound stream opened");
        Ok(writer)
    }

    fn drop_writer(&self, peer: &PeerId, writer: &Writer) {
        let mut outbound = self.outbound.lock();
        if outbound.get(peer).is_some_and(|w| Arc::ptr_eq(w, writer)) {
            outbound.remove(peer);
        }
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }
}

async fn read_stream(
    peer: PeerId,
    stream: BoxedStream,
    receiver: Arc<dyn MessageReceiver>,
    max_frame_size: usize,
) {
    let mut frames = FramedRead::new(stream, MessageCodec::new(max_frame_size));
    while let Some(item) = frames.next().await {
        match item {
            Ok(message) => {
                trace!(peer = %peer, kind = message.kind(), channel_id = %message.channel_id(), "Message received");
                receiver.receive_message(peer.clone(), message).await;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Closing inbound stream after bad frame");
                receiver.receive_error(peer.clone(), e).await;
                break;
            }
        }
    }
    trace!(peer = %peer, "Inbound stream closed");
}

#[async_trait]
impl<H: StreamHost> DataTransferNetwork for StreamNetwork<H> {
    fn local_peer(&self) -> PeerId {
        self.host.local_peer()
    }

    async fn send_message(
        &self,
        peer: &PeerId,
        message: TransferMessage,
    ) -> Result<(), NetworkError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(NetworkError::Closed);
        }

        let attempts = self.config.max_send_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.backoff_for(attempt)).await;
            }

            let writer = match self.writer_for(peer).await {
                Ok(writer) => writer,
                Err(e) if e.is_retryable() => {
                    debug!(peer = %peer, attempt, error = %e, "Failed to open stream");
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let sent = writer.lock().await.send(message.clone()).await;
            match sent {
                Ok(()) => {
                    trace!(peer = %peer, kind = message.kind(), channel_id = %message.channel_id(), "Message sent");
                    return Ok(());
                }
                Err(e) if e.is_retryable() => {
                    debug!(peer = %peer, attempt, error = %e, "Send failed, dropping stream");
                    self.drop_writer(peer, &writer);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let reason = last_error.map_or_else(|| "unknown".to_string(), |e| e.to_string());
        warn!(peer = %peer, attempts, reason = %reason, "Giving up on send");
        Err(NetworkError::SendFailed {
            peer: peer.clone(),
            attempts,
            reason,
        })
    }

    async fn start(&self, receiver: Arc<dyn MessageReceiver>) -> Result<(), NetworkError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Network already started");
            return Ok(());
        }
        self.stopped.store(false, Ordering::SeqCst);

        let host = self.host.clone();
        let tasks = self.tasks.clone();
        let max_frame_size = self.config.max_frame_size;

        let accept_loop = tokio::spawn(async move {
            while let Some((peer, stream)) = host.accept().await {
                trace!(peer = %peer, "Inbound stream accepted");
                let reader = tokio::spawn(read_stream(
                    peer,
                    stream,
                    receiver.clone(),
                    max_frame_size,
                ));
                let mut tasks = tasks.lock();
                tasks.retain(|h| !h.is_finished());
                tasks.push(reader);
            }
            debug!("Accept loop finished");
        });
        self.track(accept_loop);

        info!(peer = %self.host.local_peer(), "Data-transfer network started");
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        self.outbound.lock().clear();
        info!(peer = %self.host.local_peer(), "Data-transfer network stopped");
    }
}

impl<H: StreamHost> Drop for StreamNetwork<H> {
    fn drop(&mut self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}
