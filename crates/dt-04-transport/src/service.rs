//! # Transport Adapter
//!
//! Bridges channel actors and the block-transport substrate.
//!
//! ```text
//!  actor ──start/pause/resume/cancel──► TransportAdapter ──► BlockTransport
//!                                              ▲                  │
//!                                              │   SubstrateSink  │
//!  actor ◄──(ChannelId, TransportEvent)── pump ◄──────────────────┘
//! ```
//!
//! Stalls are retried with exponential backoff. A resumable substrate
//! restarts at the acknowledged point; any other substrate starts over and
//! the replayed prefix is swallowed by the progress tracker.

use crate::config::TransportConfig;
use crate::domain::errors::TransportError;
use crate::domain::progress::ProgressTracker;
use crate::domain::types::{
    ResumePoint, SubstrateEvent, TransferOutcome, TransferRequest, TransportEvent,
};
use crate::ports::inbound::ChannelTransport;
use crate::ports::outbound::{BlockTransport, SinkEvent, SubstrateSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ChannelId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Receiving end for transport events, one stream for all channels.
pub type TransportEvents = mpsc::UnboundedReceiver<(ChannelId, TransportEvent)>;

struct ActiveTransfer {
    request: TransferRequest,
    generation: u64,
    retries: u32,
    tracker: ProgressTracker,
    paused: bool,
}

enum Action {
    Forward(TransportEvent),
    Retry {
        request: TransferRequest,
        generation: u64,
        retry: u32,
        paused: bool,
    },
}

struct Shared {
    substrate: Arc<dyn BlockTransport>,
    config: TransportConfig,
    active: Mutex<HashMap<ChannelId, ActiveTransfer>>,
    sink_tx: mpsc::UnboundedSender<SinkEvent>,
    events_tx: mpsc::UnboundedSender<(ChannelId, TransportEvent)>,
}

impl Shared {
    fn forward(&self, channel_id: ChannelId, event: TransportEvent) {
        if self.events_tx.send((channel_id, event)).is_err() {
            trace!("Transport event receiver gone");
        }
    }

    fn start_point(&self, acked: ResumePoint) -> ResumePoint {
        if self.substrate.supports_resume() {
            acked
        } else {
            ResumePoint::default()
        }
    }

    fn handle(self: &Arc<Self>, sink_event: SinkEvent) {
        let SinkEvent {
            channel_id,
            generation,
            event,
        } = sink_event;

        let action = {
            let mut active = self.active.lock();
            let Some(entry) = active.get_mut(&channel_id) else {
                trace!(channel_id = %channel_id, "Dropping event for inactive channel");
                return;
            };
            if entry.generation != generation {
                trace!(channel_id = %channel_id, generation, "Dropping event from earlier run");
                return;
            }

            match event {
                SubstrateEvent::Progress { bytes, blocks } => {
                    let Some((bytes_delta, blocks_delta)) = entry.tracker.apply(bytes, blocks)
                    else {
                        return;
                    };
                    entry.retries = 0;
                    Action::Forward(TransportEvent::Progress {
                        bytes_delta,
                        blocks_delta,
                    })
                }
                SubstrateEvent::Completed => {
                    active.remove(&channel_id);
                    Action::Forward(TransportEvent::Finished(TransferOutcome::Completed))
                }
                SubstrateEvent::Failed { reason } => {
                    active.remove(&channel_id);
                    Action::Forward(TransportEvent::Finished(TransferOutcome::Failed(reason)))
                }
                SubstrateEvent::Stalled { reason } => {
                    if entry.retries >= self.config.max_retries {
                        let retries = entry.retries;
                        active.remove(&channel_id);
                        warn!(channel_id = %channel_id, retries, reason = %reason, "Transfer stalled, retries exhausted");
                        Action::Forward(TransportEvent::Finished(TransferOutcome::Failed(
                            format!("stalled after {retries} retries: {reason}"),
                        )))
                    } else {
                        entry.retries += 1;
                        entry.generation += 1;
                        let start = self.start_point(entry.tracker.acknowledged());
                        entry.tracker.restart_at(start);

                        let mut request = entry.request.clone();
                        request.resume_from = (!start.is_zero()).then_some(start);
                        debug!(channel_id = %channel_id, retry = entry.retries, reason = %reason, "Transfer stalled, retrying");
                        Action::Retry {
                            request,
                            generation: entry.generation,
                            retry: entry.retries,
                            paused: entry.paused,
                        }
                    }
                }
            }
        };

        match action {
            Action::Forward(event) => self.forward(channel_id, event),
            Action::Retry {
                request,
                generation,
                retry,
                paused,
            } => {
                let shared = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(shared.config.backoff_for(retry)).await;
                    shared.restart(request, generation, paused).await;
                });
            }
        }
    }

    async fn restart(self: &Arc<Self>, request: TransferRequest, generation: u64, paused: bool) {
        let channel_id = request.channel_id.clone();
        let current = self
            .active
            .lock()
            .get(&channel_id)
            .map(|entry| entry.generation);
        if current != Some(generation) {
            trace!(channel_id = %channel_id, "Retry superseded");
            return;
        }

        let sink = SubstrateSink::new(channel_id.clone(), generation, self.sink_tx.clone());
        let result = match self.substrate.start(request, sink).await {
            Ok(()) if paused => self.substrate.pause(&channel_id).await,
            other => other,
        };

        if let Err(e) = result {
            let removed = {
                let mut active = self.active.lock();
                let matches = active
                    .get(&channel_id)
                    .is_some_and(|entry| entry.generation == generation);
                if matches {
                    active.remove(&channel_id);
                }
                matches
            };
            if removed {
                warn!(channel_id = %channel_id, error = %e, "Retry failed to start");
                self.forward(
                    channel_id,
                    TransportEvent::Finished(TransferOutcome::Failed(e.to_string())),
                );
            }
        }
    }
}

/// Transport adapter. Create inside a tokio runtime.
pub struct TransportAdapter {
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
}

impl TransportAdapter {
    /// Create an adapter and the stream its events arrive on.
    pub fn new(
        substrate: Arc<dyn BlockTransport>,
        config: TransportConfig,
    ) -> (Self, TransportEvents) {
        let (sink_tx, mut sink_rx) = mpsc::unbounded_channel::<SinkEvent>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            substrate,
            config,
            active: Mutex::new(HashMap::new()),
            sink_tx,
            events_tx,
        });

        let pump_shared = shared.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = sink_rx.recv().await {
                pump_shared.handle(event);
            }
        });

        (Self { shared, pump }, events_rx)
    }

    /// Channels with a running transfer.
    #[must_use]
    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.shared.active.lock().keys().cloned().collect()
    }
}

impl Drop for TransportAdapter {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl ChannelTransport for TransportAdapter {
    async fn start(&self, request: TransferRequest) -> Result<(), TransportError> {
        let channel_id = request.channel_id.clone();
        let acked = request.resume_from.unwrap_or_default();
        let start = self.shared.start_point(acked);

        let generation = {
            let mut active = self.shared.active.lock();
            let generation = active
                .get(&channel_id)
                .map_or(0, |entry| entry.generation + 1);
            let mut tracker = ProgressTracker::new(acked);
            tracker.restart_at(start);

            active.insert(
                channel_id.clone(),
                ActiveTransfer {
                    request: request.clone(),
                    generation,
                    retries: 0,
                    tracker,
                    paused: false,
                },
            );
            generation
        };

        let mut substrate_request = request;
        substrate_request.resume_from = (!start.is_zero()).then_some(start);
        debug!(
            channel_id = %channel_id,
            resume_bytes = start.bytes,
            resume_blocks = start.blocks,
            "Starting transfer"
        );

        let sink = SubstrateSink::new(channel_id.clone(), generation, self.shared.sink_tx.clone());
        if let Err(e) = self.shared.substrate.start(substrate_request, sink).await {
            let mut active = self.shared.active.lock();
            if active
                .get(&channel_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                active.remove(&channel_id);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn pause(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        let known = match self.shared.active.lock().get_mut(channel_id) {
            Some(entry) => {
                entry.paused = true;
                true
            }
            None => false,
        };
        if !known {
            trace!(channel_id = %channel_id, "Pause for inactive channel ignored");
            return Ok(());
        }
        self.shared.substrate.pause(channel_id).await
    }

    async fn resume(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        let known = match self.shared.active.lock().get_mut(channel_id) {
            Some(entry) => {
                entry.paused = false;
                true
            }
            None => false,
        };
        if !known {
            trace!(channel_id = %channel_id, "Resume for inactive channel ignored");
            return Ok(());
        }
        self.shared.substrate.resume(channel_id).await
    }

    async fn cancel(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        let was_active = self.shared.active.lock().remove(channel_id).is_some();
        if !was_active {
            return Ok(());
        }
        debug!(channel_id = %channel_id, "Cancelling transfer");
        self.shared.substrate.cancel(channel_id).await
    }

    fn supports_resume(&self) -> bool {
        self.shared.substrate.supports_resume()
    }

    fn is_active(&self, channel_id: &ChannelId) -> bool {
        self.shared.active.lock().contains_key(channel_id)
    }
}
