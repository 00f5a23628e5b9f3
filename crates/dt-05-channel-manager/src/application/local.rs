//! Local commands, transport events and recovery for a channel actor.

use super::actor::ChannelActor;
use crate::domain::{unpaused_status, DataTransferError, DataTransferResult};
use dt_03_network::{ErrorCode, TransferMessage};
use dt_04_transport::{TransferOutcome, TransportEvent};
use shared_types::{ChannelStatus, EventCode, TypedPayload, ValidationError, Voucher};
use tracing::{debug, info, trace};

impl ChannelActor {
    pub(super) async fn open_local(&mut self, wire_voucher: TypedPayload) -> DataTransferResult<()> {
        self.persist_initial()?;

        let open = TransferMessage::Open {
            channel_id: self.state.channel_id.clone(),
            direction: self.state.direction,
            base_cid: self.state.base_cid.clone(),
            selector: self.state.selector.clone(),
            voucher: wire_voucher,
        };
        if let Err(e) = self.send(open).await {
            let reason = format!("failed to send open request: {e}");
            let mut next = self.with_status(ChannelStatus::Failed);
            next.message = reason.clone();
            self.commit(next, EventCode::Error, reason).await?;
            return Err(e.into());
        }

        let next = self.with_status(ChannelStatus::Open);
        self.commit(next, EventCode::Open, "").await
    }

    pub(super) async fn send_voucher(&mut self, voucher: Voucher) -> DataTransferResult<()> {
        let status = self.state.status;
        if !self.state.is_requester()
            || status.is_terminal()
            || matches!(status, ChannelStatus::New | ChannelStatus::Failed)
        {
            return Err(DataTransferError::invalid_state(
                &self.state.channel_id,
                status,
                "send a voucher on",
            ));
        }
        let wire = self.ctx.encode_voucher(&voucher)?;

        let mut next = self.state.clone();
        next.vouchers.push(voucher);
        self.commit(next, EventCode::NewVoucher, "").await?;

        self.send(TransferMessage::Voucher {
            channel_id: self.state.channel_id.clone(),
            voucher: wire,
        })
        .await?;
        Ok(())
    }

    pub(super) async fn pause_local(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if !matches!(
            status,
            ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused
        ) {
            return Err(DataTransferError::invalid_state(
                &self.state.channel_id,
                status,
                "pause",
            ));
        }
        if self.state.pause.local {
            return Ok(());
        }

        let mut next = self.with_status(ChannelStatus::Paused);
        next.pause.local = true;
        self.commit(next, EventCode::PauseLocal, "").await?;
        self.hold_transport().await;
        self.notify(TransferMessage::Pause {
            channel_id: self.state.channel_id.clone(),
        })
        .await;
        Ok(())
    }

    pub(super) async fn resume_local(&mut self) -> DataTransferResult<()> {
        if !self.state.pause.local {
            return Ok(());
        }
        let status = self.state.status;
        if status.is_terminal() || status == ChannelStatus::Failed {
            return Err(DataTransferError::invalid_state(
                &self.state.channel_id,
                status,
                "resume",
            ));
        }

        let mut next = self.state.clone();
        next.pause.local = false;
        if next.status == ChannelStatus::Paused && !next.pause.any() {
            next.status = unpaused_status(next.transferred_blocks(), next.transferred_bytes());
        }
        self.commit(next, EventCode::ResumeLocal, "").await?;
        self.notify(TransferMessage::Resume {
            channel_id: self.state.channel_id.clone(),
        })
        .await;
        self.release_transport().await
    }

    pub(super) async fn cancel_local(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if status.is_terminal() || status == ChannelStatus::Failed {
            trace!(channel_id = %self.state.channel_id, status = %status, "Cancel on ended channel ignored");
            return Ok(());
        }

        let mut next = self.with_status(ChannelStatus::Cancelled);
        next.message = "cancelled locally".to_string();
        self.commit(next, EventCode::Cancel, "cancelled locally").await?;
        self.abort_transport().await;
        self.notify(TransferMessage::Cancel {
            channel_id: self.state.channel_id.clone(),
        })
        .await;
        Ok(())
    }

    /// Restart from the persisted progress point.
    ///
    /// The requester asks the responder with Restart; the responder asks the
    /// requester with RestartExisting and waits for its Restart.
    pub(super) async fn restart_local(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if !status.is_restartable() {
            return Err(DataTransferError::invalid_state(
                &self.state.channel_id,
                status,
                "restart",
            ));
        }

        let mut next = self.with_status(ChannelStatus::Restarting);
        next.pause.remote = false;
        self.commit(next, EventCode::Restart, "").await?;
        self.abort_transport().await;

        let verdict = self
            .ctx
            .validator
            .validate_restart(&self.state.channel_id, &self.state)
            .await;
        let error = match verdict {
            Ok(result) if result.accepted => None,
            Ok(_) => Some(ValidationError::Rejected("restart rejected".to_string())),
            Err(e) => Some(e),
        };
        if let Some(e) = error {
            self.fail(e.to_string(), None).await?;
            return Err(e.into());
        }

        let channel_id = self.state.channel_id.clone();
        let request = if self.state.is_requester() {
            TransferMessage::Restart { channel_id }
        } else {
            self.restart_requested = true;
            TransferMessage::RestartExisting { channel_id }
        };
        if let Err(e) = self.send(request).await {
            self.restart_requested = false;
            self.fail(format!("failed to send restart request: {e}"), None)
                .await?;
            return Err(e.into());
        }
        info!(channel_id = %self.state.channel_id, "Restart requested");
        Ok(())
    }

    pub(super) async fn on_transport(&mut self, event: TransportEvent) -> DataTransferResult<()> {
        let status = self.state.status;
        match event {
            TransportEvent::Progress {
                bytes_delta,
                blocks_delta,
            } => {
                if !status.is_moving_data() {
                    trace!(channel_id = %self.state.channel_id, status = %status, "Discarding progress");
                    return Ok(());
                }
                let mut next = self.state.clone();
                next.record_progress(bytes_delta, blocks_delta);
                if next.status == ChannelStatus::Accepted {
                    next.status = ChannelStatus::Transferring;
                }
                let code = if next.is_data_sender() {
                    EventCode::DataSent
                } else {
                    EventCode::DataReceived
                };
                self.commit(next, code, "").await?;
                self.enforce_data_limit().await
            }
            TransportEvent::Finished(TransferOutcome::Completed) => match status {
                ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused => {
                    let next = self.with_status(ChannelStatus::Completing);
                    self.commit(next, EventCode::Completing, "").await?;
                    self.complete().await
                }
                ChannelStatus::Completing => self.complete().await,
                _ => {
                    trace!(channel_id = %self.state.channel_id, status = %status, "Discarding completion");
                    Ok(())
                }
            },
            TransportEvent::Finished(TransferOutcome::Failed(reason)) => {
                if !status.is_moving_data() {
                    trace!(channel_id = %self.state.channel_id, status = %status, "Discarding transport failure");
                    return Ok(());
                }
                self.fail(
                    format!("transport failed: {reason}"),
                    Some(ErrorCode::Transport),
                )
                .await
            }
        }
    }

    async fn complete(&mut self) -> DataTransferResult<()> {
        let next = self.with_status(ChannelStatus::Completed);
        self.commit(next, EventCode::Complete, "").await?;
        info!(
            channel_id = %self.state.channel_id,
            bytes = self.state.transferred_bytes(),
            blocks = self.state.transferred_blocks(),
            "Channel completed"
        );
        self.notify(TransferMessage::Complete {
            channel_id: self.state.channel_id.clone(),
        })
        .await;
        Ok(())
    }

    /// Responder side: hold the channel once the granted budget is used up.
    ///
    /// A channel that is already completing is left to finish.
    async fn enforce_data_limit(&mut self) -> DataTransferResult<()> {
        let holdable = matches!(
            self.state.status,
            ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused
        );
        if !holdable
            || self.state.is_requester()
            || self.state.pause.awaiting_voucher
            || !self.state.data_limit_reached()
        {
            return Ok(());
        }

        let mut next = self.state.clone();
        next.pause.awaiting_voucher = true;
        next.status = ChannelStatus::Paused;
        let limit = next.data_limit.unwrap_or_default();
        self.commit(
            next,
            EventCode::DataLimitExceeded,
            format!("data limit of {limit} bytes reached"),
        )
        .await?;
        self.hold_transport().await;
        self.notify(TransferMessage::Pause {
            channel_id: self.state.channel_id.clone(),
        })
        .await;
        Ok(())
    }

    /// Stop the transport for shutdown. The stored status is kept so the
    /// next start recovers the channel.
    pub(super) async fn detach(&mut self) -> DataTransferResult<()> {
        if self.state.status.is_moving_data() {
            self.abort_transport().await;
            debug!(channel_id = %self.state.channel_id, status = %self.state.status, "Transport released for shutdown");
        }
        Ok(())
    }

    /// Re-attach a persisted channel after a restart of this process.
    pub(super) async fn recover(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if status == ChannelStatus::Failed {
            return Ok(());
        }

        if status.is_moving_data() && self.ctx.transport.supports_resume() {
            let next = self.state.clone();
            self.commit(next, EventCode::Recovered, "recovered after restart")
                .await?;
            debug!(
                channel_id = %self.state.channel_id,
                status = %status,
                bytes = self.state.transferred_bytes(),
                "Resuming recovered channel"
            );
            return self.release_transport().await;
        }

        self.fail(
            format!("interrupted in status {status}; restart required"),
            None,
        )
        .await
    }
}
