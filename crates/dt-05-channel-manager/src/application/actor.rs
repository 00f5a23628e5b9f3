//! # Channel Actor
//!
//! One tokio task per channel. Local commands, remote messages and transport
//! events for a channel all arrive on its inbox and are handled strictly in
//! order, so a transition never interleaves with another one on the same
//! channel. Other channels run on their own tasks.
//!
//! Every transition goes through [`ChannelActor::commit`]:
//!
//! ```text
//! check table ──► store.put ──► snapshot ──► publish
//!                    │
//!                    └── error: state untouched, error returned
//! ```

use super::context::ChannelContext;
use crate::domain::{can_transition, DataTransferError, DataTransferResult};
use dt_03_network::{ErrorCode, NetworkError, TransferMessage};
use dt_04_transport::{ResumePoint, TransferRequest, TransportError, TransportEvent};
use parking_lot::RwLock;
use shared_bus::EventPublisher;
use shared_types::{
    now_millis, ChannelEvent, ChannelId, ChannelState, ChannelStatus, Direction, EventCode,
    PeerId, TypedPayload, ValidationError, ValidationResult, Voucher,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, trace, warn};

pub(crate) type Reply<T> = oneshot::Sender<DataTransferResult<T>>;

/// Live actors of one manager, by channel.
pub(crate) type ChannelMap = Arc<RwLock<HashMap<ChannelId, ChannelHandle>>>;

pub(crate) enum Command {
    /// Persist and send the Open request for a locally created channel.
    OpenLocal {
        wire_voucher: TypedPayload,
        reply: Reply<()>,
    },
    /// Validate an inbound Open; the channel state carries the wire voucher.
    OpenRemote,
    SendVoucher {
        voucher: Voucher,
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Cancel {
        reply: Reply<()>,
    },
    Restart {
        reply: Reply<()>,
    },
    Remote {
        from: PeerId,
        message: TransferMessage,
    },
    Transport(TransportEvent),
    /// Re-attach after a process restart.
    Recover {
        reply: Reply<()>,
    },
    /// Release the transport on shutdown without touching the stored state.
    Detach {
        reply: Reply<()>,
    },
}

/// Sending side of a channel actor plus its latest snapshot.
#[derive(Clone)]
pub(crate) struct ChannelHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<ChannelState>,
    pending: Arc<AtomicUsize>,
    warn_at: usize,
}

impl ChannelHandle {
    /// Queue a command. `false` if the actor has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.try_send(command).is_ok()
    }

    /// Queue a command, handing it back if the actor has stopped.
    pub fn try_send(&self, command: Command) -> Result<(), Command> {
        let queued = self.pending.fetch_add(1, Ordering::Relaxed) + 1;
        if self.warn_at > 0 && queued % self.warn_at == 0 {
            warn!(
                channel_id = %self.snapshot.borrow().channel_id,
                queued,
                "Channel inbox is backing up"
            );
        }
        if let Err(mpsc::error::SendError(command)) = self.tx.send(command) {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            return Err(command);
        }
        Ok(())
    }

    /// Whether both handles drive the same actor.
    pub fn same_actor(&self, other: &ChannelHandle) -> bool {
        Arc::ptr_eq(&self.pending, &other.pending)
    }

    /// Queue a command and wait for its reply.
    pub async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> DataTransferResult<T> {
        let (reply, rx) = oneshot::channel();
        if !self.send(make(reply)) {
            return Err(DataTransferError::NotRunning);
        }
        rx.await.unwrap_or(Err(DataTransferError::NotRunning))
    }

    pub fn snapshot(&self) -> ChannelState {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> ChannelStatus {
        self.snapshot.borrow().status
    }

    /// Not yet completed, cancelled, rejected or failed.
    pub fn is_in_progress(&self) -> bool {
        let status = self.status();
        !status.is_terminal() && status != ChannelStatus::Failed
    }
}

pub(crate) struct ChannelActor {
    pub(super) state: ChannelState,
    pub(super) ctx: Arc<ChannelContext>,
    snapshot: watch::Sender<ChannelState>,
    pending: Arc<AtomicUsize>,
    channels: Weak<RwLock<HashMap<ChannelId, ChannelHandle>>>,
    /// We sent RestartExisting and expect the requester's Restart.
    pub(super) restart_requested: bool,
}

/// Start an actor owning `state`. It leaves `channels` on its own once the
/// channel ends.
pub(crate) fn spawn_channel(
    ctx: Arc<ChannelContext>,
    channels: &ChannelMap,
    state: ChannelState,
) -> ChannelHandle {
    let (actor, handle, inbox) = ChannelActor::new(ctx, Arc::downgrade(channels), state);
    tokio::spawn(actor.run(inbox));
    handle
}

impl ChannelActor {
    fn new(
        ctx: Arc<ChannelContext>,
        channels: Weak<RwLock<HashMap<ChannelId, ChannelHandle>>>,
        state: ChannelState,
    ) -> (Self, ChannelHandle, mpsc::UnboundedReceiver<Command>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(state.clone());
        let pending = Arc::new(AtomicUsize::new(0));
        let handle = ChannelHandle {
            tx,
            snapshot,
            pending: pending.clone(),
            warn_at: ctx.inbox_warning_threshold,
        };
        let actor = ChannelActor {
            state,
            ctx,
            snapshot: snapshot_tx,
            pending,
            channels,
            restart_requested: false,
        };
        (actor, handle, inbox)
    }

    /// Actor outside any manager, driven directly by unit tests.
    #[cfg(test)]
    pub(super) fn detached(
        ctx: Arc<ChannelContext>,
        state: ChannelState,
    ) -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (actor, _handle, inbox) = Self::new(ctx, Weak::new(), state);
        (actor, inbox)
    }

    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = inbox.recv().await {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            self.handle(command).await;
            if self.state.status.is_terminal() {
                self.retire(&mut inbox).await;
                return;
            }
        }
        trace!(channel_id = %self.state.channel_id, "Channel actor stopped");
    }

    /// Leave the manager's map after the channel ended. Commands already
    /// queued are still answered; later ones reload the channel from the
    /// store.
    async fn retire(&mut self, inbox: &mut mpsc::UnboundedReceiver<Command>) {
        if let Some(channels) = self.channels.upgrade() {
            let mut channels = channels.write();
            let ours = channels
                .get(&self.state.channel_id)
                .is_some_and(|handle| Arc::ptr_eq(&handle.pending, &self.pending));
            if ours {
                channels.remove(&self.state.channel_id);
            }
        }

        inbox.close();
        while let Some(command) = inbox.recv().await {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            self.handle(command).await;
        }
        debug!(
            channel_id = %self.state.channel_id,
            status = %self.state.status,
            "Channel actor retired"
        );
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::OpenLocal {
                wire_voucher,
                reply,
            } => {
                let _ = reply.send(self.open_local(wire_voucher).await);
            }
            Command::OpenRemote => {
                if let Err(e) = self.open_remote().await {
                    error!(channel_id = %self.state.channel_id, error = %e, "Failed to handle open request");
                }
            }
            Command::SendVoucher { voucher, reply } => {
                let _ = reply.send(self.send_voucher(voucher).await);
            }
            Command::Pause { reply } => {
                let _ = reply.send(self.pause_local().await);
            }
            Command::Resume { reply } => {
                let _ = reply.send(self.resume_local().await);
            }
            Command::Cancel { reply } => {
                let _ = reply.send(self.cancel_local().await);
            }
            Command::Restart { reply } => {
                let _ = reply.send(self.restart_local().await);
            }
            Command::Remote { from, message } => self.on_remote(from, message).await,
            Command::Transport(event) => {
                if let Err(e) = self.on_transport(event).await {
                    error!(channel_id = %self.state.channel_id, error = %e, "Failed to handle transport event");
                }
            }
            Command::Recover { reply } => {
                let _ = reply.send(self.recover().await);
            }
            Command::Detach { reply } => {
                let _ = reply.send(self.detach().await);
            }
        }
    }

    /// Persist a transition, then publish it.
    pub(super) async fn commit(
        &mut self,
        mut next: ChannelState,
        code: EventCode,
        message: impl Into<String>,
    ) -> DataTransferResult<()> {
        let from = self.state.status;
        if !can_transition(from, next.status) {
            return Err(DataTransferError::invalid_state(
                &next.channel_id,
                from,
                format!("move to {}", next.status),
            ));
        }

        next.updated_at = now_millis().max(self.state.updated_at);
        if let Err(e) = self.ctx.store.put(&next) {
            error!(
                channel_id = %next.channel_id,
                from = %from,
                to = %next.status,
                error = %e,
                "Failed to persist transition"
            );
            return Err(e.into());
        }

        debug!(
            channel_id = %next.channel_id,
            from = %from,
            to = %next.status,
            code = %code,
            "Channel transition"
        );
        self.state = next;
        self.snapshot.send_replace(self.state.clone());
        self.ctx
            .bus
            .publish(ChannelEvent::new(code, self.state.clone(), message))
            .await;
        Ok(())
    }

    /// Write a freshly created channel without publishing anything.
    pub(super) fn persist_initial(&mut self) -> DataTransferResult<()> {
        self.state.updated_at = now_millis();
        if let Err(e) = self.ctx.store.put(&self.state) {
            error!(channel_id = %self.state.channel_id, error = %e, "Failed to persist new channel");
            return Err(e.into());
        }
        self.snapshot.send_replace(self.state.clone());
        Ok(())
    }

    /// Copy of the current state with a new status.
    pub(super) fn with_status(&self, status: ChannelStatus) -> ChannelState {
        let mut next = self.state.clone();
        next.status = status;
        next
    }

    /// Move to `Failed`, stop the transport, optionally tell the peer.
    pub(super) async fn fail(
        &mut self,
        reason: String,
        notify: Option<ErrorCode>,
    ) -> DataTransferResult<()> {
        let mut next = self.with_status(ChannelStatus::Failed);
        next.message = reason.clone();
        self.commit(next, EventCode::Error, reason.clone()).await?;
        self.abort_transport().await;
        if let Some(code) = notify {
            self.notify(TransferMessage::error(
                self.state.channel_id.clone(),
                code,
                reason,
            ))
            .await;
        }
        Ok(())
    }

    pub(super) async fn send(&self, message: TransferMessage) -> Result<(), NetworkError> {
        self.ctx
            .network
            .send_message(&self.state.other_peer, message)
            .await
    }

    /// Send, logging instead of failing.
    pub(super) async fn notify(&self, message: TransferMessage) {
        let kind = message.kind();
        if let Err(e) = self.send(message).await {
            warn!(
                channel_id = %self.state.channel_id,
                peer = %self.state.other_peer,
                kind,
                error = %e,
                "Failed to notify peer"
            );
        }
    }

    /// Run the bound validator against `voucher` for this channel's direction.
    pub(super) async fn validate(
        &self,
        voucher: &Voucher,
    ) -> Result<ValidationResult, ValidationError> {
        let s = &self.state;
        match s.direction {
            Direction::Push => {
                self.ctx
                    .validator
                    .validate_push(&s.channel_id, &s.other_peer, voucher, &s.base_cid, &s.selector)
                    .await
            }
            Direction::Pull => {
                self.ctx
                    .validator
                    .validate_pull(&s.channel_id, &s.other_peer, voucher, &s.base_cid, &s.selector)
                    .await
            }
        }
    }

    /// Transport request resuming from the persisted counters.
    pub(super) fn transfer_request(&self) -> TransferRequest {
        let point = ResumePoint::new(
            self.state.transferred_bytes(),
            self.state.transferred_blocks(),
        );
        TransferRequest {
            channel_id: self.state.channel_id.clone(),
            peer: self.state.other_peer.clone(),
            base_cid: self.state.base_cid.clone(),
            selector: self.state.selector.clone(),
            is_sender: self.state.is_data_sender(),
            resume_from: (!point.is_zero()).then_some(point),
        }
    }

    pub(super) async fn start_transport(&self) -> Result<(), TransportError> {
        self.ctx.transport.start(self.transfer_request()).await
    }

    /// Get data moving again once no hold remains. Starts the transport if
    /// it never ran (or was stopped), otherwise resumes it.
    pub(super) async fn release_transport(&mut self) -> DataTransferResult<()> {
        if self.state.pause.any() || !self.state.status.is_moving_data() {
            return Ok(());
        }
        let channel_id = &self.state.channel_id;
        let result = if self.ctx.transport.is_active(channel_id) {
            self.ctx.transport.resume(channel_id).await
        } else {
            self.start_transport().await
        };
        if let Err(e) = result {
            return self
                .fail(
                    format!("transport failed to resume: {e}"),
                    Some(ErrorCode::Transport),
                )
                .await;
        }
        Ok(())
    }

    pub(super) async fn hold_transport(&self) {
        if let Err(e) = self.ctx.transport.pause(&self.state.channel_id).await {
            warn!(channel_id = %self.state.channel_id, error = %e, "Failed to pause transport");
        }
    }

    pub(super) async fn abort_transport(&self) {
        if let Err(e) = self.ctx.transport.cancel(&self.state.channel_id).await {
            warn!(channel_id = %self.state.channel_id, error = %e, "Failed to cancel transport");
        }
    }

    pub(super) fn unexpected(&self, kind: &str) -> DataTransferError {
        DataTransferError::Protocol(format!(
            "unexpected {kind} for channel {} in status {}",
            self.state.channel_id, self.state.status
        ))
    }
}
