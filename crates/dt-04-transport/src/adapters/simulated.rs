//! # Simulated Block Transport
//!
//! In-process substrate for tests and the demo node. Progress is either
//! injected by hand (`emit_progress`, `stall`, ...) or played back from a
//! [`BlockPlan`] on a background task.

use crate::domain::errors::TransportError;
use crate::domain::types::TransferRequest;
use crate::ports::outbound::{BlockTransport, SubstrateSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ChannelId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Automatic playback: `blocks` blocks of `block_size` bytes, one every
/// `interval`, then completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    pub block_size: u64,
    pub blocks: u64,
    pub interval: Duration,
}

impl BlockPlan {
    pub fn new(block_size: u64, blocks: u64, interval: Duration) -> Self {
        Self {
            block_size,
            blocks,
            interval,
        }
    }
}

#[derive(Default)]
struct SimChannel {
    sink: Option<SubstrateSink>,
    requests: Vec<TransferRequest>,
    run: u64,
    paused: bool,
    cancelled: bool,
    player: Option<JoinHandle<()>>,
}

type Channels = Arc<Mutex<HashMap<ChannelId, SimChannel>>>;

pub struct SimulatedTransport {
    channels: Channels,
    plan: Option<BlockPlan>,
    resumable: bool,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTransport {
    /// Resumable substrate with manual progress injection.
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            plan: None,
            resumable: true,
        }
    }

    /// Substrate that ignores resume points and always starts over.
    pub fn non_resumable() -> Self {
        Self {
            resumable: false,
            ..Self::new()
        }
    }

    /// Play `plan` for every started transfer.
    #[must_use]
    pub fn with_plan(mut self, plan: BlockPlan) -> Self {
        self.plan = Some(plan);
        self
    }

    fn live_sink(&self, channel_id: &ChannelId) -> Option<SubstrateSink> {
        let channels = self.channels.lock();
        let channel = channels.get(channel_id)?;
        if channel.paused || channel.cancelled {
            return None;
        }
        channel.sink.clone()
    }

    /// Report progress. Ignored (returns `false`) while paused or unknown.
    pub fn emit_progress(&self, channel_id: &ChannelId, bytes: u64, blocks: u64) -> bool {
        self.live_sink(channel_id)
            .is_some_and(|sink| sink.progress(bytes, blocks))
    }

    pub fn stall(&self, channel_id: &ChannelId, reason: &str) -> bool {
        self.live_sink(channel_id)
            .is_some_and(|sink| sink.stalled(reason))
    }

    pub fn complete(&self, channel_id: &ChannelId) -> bool {
        self.live_sink(channel_id).is_some_and(|sink| sink.completed())
    }

    pub fn fail(&self, channel_id: &ChannelId, reason: &str) -> bool {
        self.live_sink(channel_id)
            .is_some_and(|sink| sink.failed(reason))
    }

    /// Sink of the latest run, regardless of pause state.
    pub fn sink(&self, channel_id: &ChannelId) -> Option<SubstrateSink> {
        self.channels.lock().get(channel_id)?.sink.clone()
    }

    /// Every request seen for `channel_id`, oldest first.
    pub fn started_requests(&self, channel_id: &ChannelId) -> Vec<TransferRequest> {
        self.channels
            .lock()
            .get(channel_id)
            .map(|c| c.requests.clone())
            .unwrap_or_default()
    }

    pub fn last_request(&self, channel_id: &ChannelId) -> Option<TransferRequest> {
        self.channels.lock().get(channel_id)?.requests.last().cloned()
    }

    pub fn start_count(&self, channel_id: &ChannelId) -> usize {
        self.channels
            .lock()
            .get(channel_id)
            .map_or(0, |c| c.requests.len())
    }

    pub fn is_paused(&self, channel_id: &ChannelId) -> bool {
        self.channels
            .lock()
            .get(channel_id)
            .is_some_and(|c| c.paused)
    }

    pub fn was_cancelled(&self, channel_id: &ChannelId) -> bool {
        self.channels
            .lock()
            .get(channel_id)
            .is_some_and(|c| c.cancelled)
    }

    fn spawn_player(
        channels: Channels,
        channel_id: ChannelId,
        run: u64,
        plan: BlockPlan,
        first_block: u64,
        sink: SubstrateSink,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut block = first_block;
            while block < plan.blocks {
                tokio::time::sleep(plan.interval).await;
                let paused = {
                    let channels = channels.lock();
                    match channels.get(&channel_id) {
                        Some(c) if c.run == run && !c.cancelled => c.paused,
                        _ => return,
                    }
                };
                if paused {
                    continue;
                }
                sink.progress(plan.block_size, 1);
                block += 1;
            }
            trace!(channel_id = %channel_id, "Simulated playback finished");
            sink.completed();
        })
    }
}

#[async_trait]
impl BlockTransport for SimulatedTransport {
    async fn start(
        &self,
        request: TransferRequest,
        sink: SubstrateSink,
    ) -> Result<(), TransportError> {
        let first_block = match (self.resumable, request.resume_from) {
            (true, Some(point)) => point.blocks,
            _ => 0,
        };

        let mut channels = self.channels.lock();
        let channel = channels.entry(request.channel_id.clone()).or_default();
        if let Some(player) = channel.player.take() {
            player.abort();
        }
        channel.run += 1;
        channel.paused = false;
        channel.cancelled = false;
        channel.sink = Some(sink.clone());
        channel.requests.push(request.clone());

        if let Some(plan) = self.plan {
            channel.player = Some(Self::spawn_player(
                self.channels.clone(),
                request.channel_id,
                channel.run,
                plan,
                first_block,
                sink,
            ));
        }
        Ok(())
    }

    async fn pause(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        match self.channels.lock().get_mut(channel_id) {
            Some(channel) => {
                channel.paused = true;
                Ok(())
            }
            None => Err(TransportError::UnknownChannel(channel_id.clone())),
        }
    }

    async fn resume(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        match self.channels.lock().get_mut(channel_id) {
            Some(channel) => {
                channel.paused = false;
                Ok(())
            }
            None => Err(TransportError::UnknownChannel(channel_id.clone())),
        }
    }

    async fn cancel(&self, channel_id: &ChannelId) -> Result<(), TransportError> {
        if let Some(channel) = self.channels.lock().get_mut(channel_id) {
            channel.cancelled = true;
            if let Some(player) = channel.player.take() {
                player.abort();
            }
        }
        Ok(())
    }

    fn supports_resume(&self) -> bool {
        self.resumable
    }
}
