//! Messages from the other party of a channel.
//!
//! Anything that arrives out of order, from the wrong role, or for a status
//! that cannot take it is answered with a protocol error and leaves the
//! channel untouched. Error messages are never answered.

use super::actor::ChannelActor;
use crate::domain::{unpaused_status, DataTransferError, DataTransferResult};
use dt_03_network::{ErrorCode, TransferMessage};
use shared_types::{ChannelState, ChannelStatus, EventCode, PeerId, TypedPayload, ValidationResult};
use tracing::{debug, error, warn};

impl ChannelActor {
    pub(super) async fn on_remote(&mut self, from: PeerId, message: TransferMessage) {
        let kind = message.kind();
        let is_error = matches!(message, TransferMessage::Error { .. });

        let result = match self.check_sender(&from, &message) {
            Ok(()) => self.dispatch_remote(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {}
            Err(DataTransferError::Protocol(reason)) => {
                warn!(
                    channel_id = %self.state.channel_id,
                    peer = %from,
                    kind,
                    reason = %reason,
                    "Protocol violation"
                );
                if !is_error {
                    let reply = TransferMessage::error(
                        self.state.channel_id.clone(),
                        ErrorCode::Protocol,
                        reason,
                    );
                    if let Err(e) = self.ctx.network.send_message(&from, reply).await {
                        debug!(peer = %from, error = %e, "Failed to send protocol error");
                    }
                }
            }
            Err(e) => {
                error!(channel_id = %self.state.channel_id, kind, error = %e, "Failed to handle message");
            }
        }
    }

    fn check_sender(&self, from: &PeerId, message: &TransferMessage) -> DataTransferResult<()> {
        let kind = message.kind();
        if from != &self.state.other_peer {
            return Err(DataTransferError::Protocol(format!(
                "{kind} from {from}, who is not part of channel {}",
                self.state.channel_id
            )));
        }
        if message.is_requester_only() && self.state.is_requester() {
            return Err(DataTransferError::Protocol(format!(
                "{kind} is only sent by the requester"
            )));
        }
        if message.is_responder_only() && !self.state.is_requester() {
            return Err(DataTransferError::Protocol(format!(
                "{kind} is only sent by the responder"
            )));
        }
        Ok(())
    }

    async fn dispatch_remote(&mut self, message: TransferMessage) -> DataTransferResult<()> {
        match message {
            TransferMessage::Open { .. } => Err(DataTransferError::Protocol(format!(
                "duplicate open for channel {}",
                self.state.channel_id
            ))),
            TransferMessage::Accept {
                voucher_result,
                paused,
                ..
            } => self.on_accept(voucher_result, paused).await,
            TransferMessage::Voucher { voucher, .. } => self.on_voucher(voucher).await,
            TransferMessage::VoucherResult {
                accepted,
                voucher_result,
                paused,
                ..
            } => {
                self.on_voucher_result(accepted, voucher_result, paused)
                    .await
            }
            TransferMessage::Error { code, message, .. } => self.on_error(code, message).await,
            TransferMessage::Pause { .. } => self.on_remote_pause().await,
            TransferMessage::Resume { .. } => self.on_remote_resume().await,
            TransferMessage::Complete { .. } => self.on_remote_complete().await,
            TransferMessage::Cancel { .. } => self.on_remote_cancel().await,
            TransferMessage::Restart { .. } => self.on_remote_restart().await,
            TransferMessage::RestartExisting { .. } => self.on_restart_existing().await,
        }
    }

    /// Responder side of an inbound Open.
    pub(super) async fn open_remote(&mut self) -> DataTransferResult<()> {
        let decoded = match self.state.vouchers.first() {
            Some(wire) => self.ctx.decode_voucher(wire),
            None => {
                self.persist_initial()?;
                return self.reject_open("open without voucher".to_string(), None).await;
            }
        };
        let voucher = match decoded {
            Ok(voucher) => {
                self.state.vouchers[0] = voucher.clone();
                self.persist_initial()?;
                voucher
            }
            Err(e) => {
                self.persist_initial()?;
                return self.reject_open(format!("voucher not accepted: {e}"), None).await;
            }
        };

        match self.validate(&voucher).await {
            Ok(result) if result.accepted => self.accept_open(result).await,
            Ok(result) => {
                self.reject_open("rejected by validator".to_string(), Some(result))
                    .await
            }
            Err(e) => self.reject_open(e.to_string(), None).await,
        }
    }

    async fn accept_open(&mut self, result: ValidationResult) -> DataTransferResult<()> {
        let wire_result = self.ctx.encode_result(result.voucher_result.as_ref());

        let mut next = self.with_status(ChannelStatus::Accepted);
        next.voucher_results.extend(result.voucher_result);
        next.data_limit = result.data_limit;
        self.commit(next, EventCode::Accept, "").await?;

        if result.for_pause {
            let mut next = self.with_status(ChannelStatus::Paused);
            next.pause.awaiting_voucher = true;
            self.commit(next, EventCode::PauseLocal, "awaiting voucher")
                .await?;
        }

        let accept = TransferMessage::Accept {
            channel_id: self.state.channel_id.clone(),
            voucher_result: wire_result,
            paused: result.for_pause,
        };
        if let Err(e) = self.send(accept).await {
            self.fail(format!("failed to send accept: {e}"), None).await?;
            return Err(e.into());
        }
        self.release_transport().await
    }

    async fn reject_open(
        &mut self,
        reason: String,
        result: Option<ValidationResult>,
    ) -> DataTransferResult<()> {
        debug!(channel_id = %self.state.channel_id, reason = %reason, "Rejecting open request");
        let mut next = self.with_status(ChannelStatus::Failed);
        next.voucher_results
            .extend(result.and_then(|r| r.voucher_result));
        next.message = reason.clone();
        self.commit(next, EventCode::Error, reason.clone()).await?;
        self.notify(TransferMessage::error(
            self.state.channel_id.clone(),
            ErrorCode::Rejected,
            reason,
        ))
        .await;
        Ok(())
    }

    /// Requester side: the responder accepted an Open or a Restart.
    async fn on_accept(
        &mut self,
        wire_result: Option<TypedPayload>,
        paused: bool,
    ) -> DataTransferResult<()> {
        if !matches!(
            self.state.status,
            ChannelStatus::Open | ChannelStatus::Restarting
        ) {
            return Err(self.unexpected("Accept"));
        }

        let mut next = self.state.clone();
        next.voucher_results
            .extend(self.ctx.decode_result(wire_result));
        next.pause.remote = paused;
        next.status = if next.pause.any() {
            ChannelStatus::Paused
        } else {
            ChannelStatus::Accepted
        };
        self.commit(next, EventCode::Accept, "").await?;
        self.release_transport().await
    }

    /// Responder side: revalidate a further voucher.
    async fn on_voucher(&mut self, wire: TypedPayload) -> DataTransferResult<()> {
        if !matches!(
            self.state.status,
            ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused
        ) {
            return Err(self.unexpected("Voucher"));
        }

        let voucher = match self.ctx.decode_voucher(&wire) {
            Ok(voucher) => voucher,
            Err(e) => {
                let next = self.state.clone();
                return self
                    .reject_voucher(next, None, format!("voucher not accepted: {e}"))
                    .await;
            }
        };

        let mut next = self.state.clone();
        next.vouchers.push(voucher.clone());
        let result = match self.validate(&voucher).await {
            Ok(result) if result.accepted => result,
            Ok(result) => {
                return self
                    .reject_voucher(next, Some(result), "voucher rejected by validator".into())
                    .await
            }
            Err(e) => return self.reject_voucher(next, None, e.to_string()).await,
        };

        let wire_result = self.ctx.encode_result(result.voucher_result.as_ref());
        let was_paused = self.state.pause.any();
        next.voucher_results.extend(result.voucher_result);
        next.data_limit = result.data_limit;
        next.pause.awaiting_voucher = result.for_pause || next.data_limit_reached();
        apply_hold_status(&mut next);
        self.commit(next, EventCode::NewVoucher, "").await?;

        self.notify(TransferMessage::VoucherResult {
            channel_id: self.state.channel_id.clone(),
            accepted: true,
            voucher_result: wire_result,
            paused: self.state.pause.awaiting_voucher,
        })
        .await;
        self.follow_holds(was_paused).await
    }

    async fn reject_voucher(
        &mut self,
        mut next: ChannelState,
        result: Option<ValidationResult>,
        reason: String,
    ) -> DataTransferResult<()> {
        let result = result.and_then(|r| r.voucher_result);
        let wire_result = self.ctx.encode_result(result.as_ref());
        next.voucher_results.extend(result);
        next.status = ChannelStatus::Failed;
        next.message = reason.clone();
        self.commit(next, EventCode::Error, reason).await?;
        self.abort_transport().await;
        self.notify(TransferMessage::VoucherResult {
            channel_id: self.state.channel_id.clone(),
            accepted: false,
            voucher_result: wire_result,
            paused: false,
        })
        .await;
        Ok(())
    }

    /// Requester side: verdict on a voucher we sent.
    async fn on_voucher_result(
        &mut self,
        accepted: bool,
        wire_result: Option<TypedPayload>,
        paused: bool,
    ) -> DataTransferResult<()> {
        if !matches!(
            self.state.status,
            ChannelStatus::Accepted
                | ChannelStatus::Transferring
                | ChannelStatus::Paused
                | ChannelStatus::Completing
        ) {
            return Err(self.unexpected("VoucherResult"));
        }

        let mut next = self.state.clone();
        next.voucher_results
            .extend(self.ctx.decode_result(wire_result));

        if !accepted {
            let reason = "voucher rejected by responder".to_string();
            next.status = ChannelStatus::Failed;
            next.message = reason.clone();
            self.commit(next, EventCode::Error, reason).await?;
            self.abort_transport().await;
            return Ok(());
        }

        let was_paused = self.state.pause.any();
        next.pause.remote = paused;
        apply_hold_status(&mut next);
        self.commit(next, EventCode::NewVoucherResult, "").await?;
        self.follow_holds(was_paused).await
    }

    async fn on_error(&mut self, code: ErrorCode, message: String) -> DataTransferResult<()> {
        let status = self.state.status;
        if status.is_terminal() || status == ChannelStatus::Failed {
            debug!(channel_id = %self.state.channel_id, code = %code, "Error for ended channel ignored");
            return Ok(());
        }

        let (target, event) = match (&code, status) {
            (ErrorCode::Rejected, ChannelStatus::Open) => {
                (ChannelStatus::Rejected, EventCode::Rejected)
            }
            (ErrorCode::Duplicate { .. }, ChannelStatus::New | ChannelStatus::Open) => {
                (ChannelStatus::Cancelled, EventCode::Cancel)
            }
            _ => (ChannelStatus::Failed, EventCode::Error),
        };
        let text = format!("{code}: {message}");

        let mut next = self.with_status(target);
        next.message = text.clone();
        self.commit(next, event, text).await?;
        self.abort_transport().await;
        Ok(())
    }

    async fn on_remote_pause(&mut self) -> DataTransferResult<()> {
        match self.state.status {
            ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused => {}
            ChannelStatus::Completing => return Ok(()),
            _ => return Err(self.unexpected("Pause")),
        }
        if self.state.pause.remote {
            return Ok(());
        }

        let mut next = self.with_status(ChannelStatus::Paused);
        next.pause.remote = true;
        self.commit(next, EventCode::PauseRemote, "").await?;
        self.hold_transport().await;
        Ok(())
    }

    async fn on_remote_resume(&mut self) -> DataTransferResult<()> {
        if !self.state.pause.remote {
            return Ok(());
        }
        if !self.state.status.is_moving_data() {
            return Err(self.unexpected("Resume"));
        }

        let mut next = self.state.clone();
        next.pause.remote = false;
        apply_hold_status(&mut next);
        self.commit(next, EventCode::ResumeRemote, "").await?;
        self.release_transport().await
    }

    /// The peer's transport finished; ours may still be running.
    async fn on_remote_complete(&mut self) -> DataTransferResult<()> {
        match self.state.status {
            ChannelStatus::Completed | ChannelStatus::Completing => Ok(()),
            ChannelStatus::Accepted | ChannelStatus::Transferring | ChannelStatus::Paused => {
                let next = self.with_status(ChannelStatus::Completing);
                self.commit(next, EventCode::Completing, "peer finished")
                    .await
            }
            _ => Err(self.unexpected("Complete")),
        }
    }

    async fn on_remote_cancel(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if status.is_terminal() || status == ChannelStatus::Failed {
            return Ok(());
        }
        let mut next = self.with_status(ChannelStatus::Cancelled);
        next.message = "cancelled by peer".to_string();
        self.commit(next, EventCode::Cancel, "cancelled by peer")
            .await?;
        self.abort_transport().await;
        Ok(())
    }

    /// Responder side of a restart, whichever party asked for it.
    async fn on_remote_restart(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if !status.is_restartable() && status != ChannelStatus::Restarting {
            return Err(self.unexpected("Restart"));
        }
        let we_asked = self.restart_requested && status == ChannelStatus::Restarting;
        self.restart_requested = false;

        let mut result = None;
        if !we_asked {
            if status != ChannelStatus::Restarting {
                let next = self.with_status(ChannelStatus::Restarting);
                self.commit(next, EventCode::Restart, "restart requested by peer")
                    .await?;
                self.abort_transport().await;
            }
            let verdict = self
                .ctx
                .validator
                .validate_restart(&self.state.channel_id, &self.state)
                .await;
            match verdict {
                Ok(r) if r.accepted => result = r.voucher_result,
                Ok(_) => {
                    return self
                        .fail("restart rejected".to_string(), Some(ErrorCode::Rejected))
                        .await
                }
                Err(e) => return self.fail(e.to_string(), Some(ErrorCode::Rejected)).await,
            }
        }

        let wire_result = self.ctx.encode_result(result.as_ref());
        let mut next = self.state.clone();
        next.voucher_results.extend(result);
        next.pause.remote = false;
        next.pause.awaiting_voucher = next.data_limit_reached();
        next.status = if next.pause.any() {
            ChannelStatus::Paused
        } else {
            ChannelStatus::Accepted
        };
        self.commit(next, EventCode::Accept, "restarted").await?;

        let accept = TransferMessage::Accept {
            channel_id: self.state.channel_id.clone(),
            voucher_result: wire_result,
            paused: self.state.pause.any(),
        };
        if let Err(e) = self.send(accept).await {
            self.fail(format!("failed to send accept: {e}"), None).await?;
            return Err(e.into());
        }
        self.release_transport().await
    }

    /// Requester side: the responder wants the channel restarted.
    async fn on_restart_existing(&mut self) -> DataTransferResult<()> {
        let status = self.state.status;
        if status == ChannelStatus::Restarting {
            return Ok(());
        }
        if !status.is_restartable() {
            return Err(self.unexpected("RestartExisting"));
        }
        match self.restart_local().await {
            Err(DataTransferError::Validation(e)) => {
                self.notify(TransferMessage::error(
                    self.state.channel_id.clone(),
                    ErrorCode::Rejected,
                    e.to_string(),
                ))
                .await;
                Ok(())
            }
            other => other,
        }
    }

    /// Pause or release the transport after the holds changed.
    async fn follow_holds(&mut self, was_paused: bool) -> DataTransferResult<()> {
        let now_paused = self.state.pause.any();
        if now_paused && !was_paused {
            self.hold_transport().await;
        } else if was_paused && !now_paused {
            return self.release_transport().await;
        }
        Ok(())
    }
}

/// Bring `status` in line with the pause holds.
fn apply_hold_status(next: &mut ChannelState) {
    next.status = match (next.pause.any(), next.status) {
        (true, ChannelStatus::Accepted | ChannelStatus::Transferring) => ChannelStatus::Paused,
        (false, ChannelStatus::Paused) => {
            unpaused_status(next.transferred_blocks(), next.transferred_bytes())
        }
        (_, status) => status,
    };
}
