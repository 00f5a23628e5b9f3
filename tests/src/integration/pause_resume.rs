//! # Pause Holds
//!
//! A channel stays paused while any hold is set: a local pause, the peer's
//! pause, or a responder waiting for another voucher.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{
        next_event, settle, voucher, wait_until, PeerBuilder, ScriptedValidator,
    };
    use dt_03_network::MemoryNetwork;
    use dt_05_channel_manager::{DataTransferApi, DataTransferError};
    use shared_types::{ChannelStatus, EventCode, ValidationResult};

    #[tokio::test]
    async fn test_accept_for_pause_waits_for_next_voucher() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob")
            .validator(ScriptedValidator::accept_all().then([ValidationResult::accept().paused()]))
            .start(&net)
            .await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-gated").await;

        let requester = alice.wait_status(&id, ChannelStatus::Paused).await;
        assert!(requester.pause.remote);
        let provider = bob.wait_status(&id, ChannelStatus::Paused).await;
        assert!(provider.pause.awaiting_voucher);

        settle().await;
        assert_eq!(alice.substrate.start_count(&id), 0);
        assert_eq!(bob.substrate.start_count(&id), 0);

        alice.manager.send_voucher(&id, voucher("unlock")).await.unwrap();

        bob.wait_starts(&id, 1).await;
        alice.wait_starts(&id, 1).await;
        let provider = bob.wait_status(&id, ChannelStatus::Accepted).await;
        assert!(!provider.pause.any());
        assert_eq!(provider.vouchers.len(), 2);
        let requester = alice.wait_status(&id, ChannelStatus::Accepted).await;
        assert!(!requester.pause.any());
        assert_eq!(bob.validator.calls(), 2);
    }

    #[tokio::test]
    async fn test_local_pause_and_resume_reach_the_peer() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_starts(&id, 1).await;
        alice.wait_starts(&id, 1).await;
        let mut provider_events = bob.channel_events(&id);

        alice.manager.pause(&id).await.unwrap();
        assert_eq!(alice.state(&id).await.status, ChannelStatus::Paused);
        assert!(alice.substrate.is_paused(&id));

        let paused = next_event(&mut provider_events, EventCode::PauseRemote).await;
        assert_eq!(paused.channel.status, ChannelStatus::Paused);
        wait_until(|| bob.substrate.is_paused(&id)).await;
        assert!(!bob.substrate.emit_progress(&id, 512, 1));

        // Pausing twice is a no-op.
        alice.manager.pause(&id).await.unwrap();

        alice.manager.resume(&id).await.unwrap();
        let resumed = next_event(&mut provider_events, EventCode::ResumeRemote).await;
        assert_eq!(resumed.channel.status, ChannelStatus::Accepted);
        wait_until(|| !bob.substrate.is_paused(&id)).await;
        assert!(!alice.substrate.is_paused(&id));

        assert!(bob.substrate.emit_progress(&id, 512, 1));
        let moving = bob.wait_status(&id, ChannelStatus::Transferring).await;
        assert_eq!(moving.sent_bytes, 512);
    }

    #[tokio::test]
    async fn test_remote_resume_keeps_local_hold() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        let mut requester_events = alice.channel_events(&id);

        bob.manager.pause(&id).await.unwrap();
        let held = next_event(&mut requester_events, EventCode::PauseRemote).await;
        assert!(held.channel.pause.remote);

        alice.manager.pause(&id).await.unwrap();
        bob.manager.resume(&id).await.unwrap();
        let released = next_event(&mut requester_events, EventCode::ResumeRemote).await;
        assert_eq!(released.channel.status, ChannelStatus::Paused);
        assert!(released.channel.pause.local);
        assert!(!released.channel.pause.remote);

        alice.manager.resume(&id).await.unwrap();
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
    }

    #[tokio::test]
    async fn test_data_limit_pauses_until_new_voucher() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob")
            .validator(
                ScriptedValidator::with_fallback(ValidationResult::accept().with_data_limit(8192))
                    .then([ValidationResult::accept().with_data_limit(2048)]),
            )
            .start(&net)
            .await;
        let alice = PeerBuilder::new("alice").start(&net).await;
        let mut requester_events = alice.events();

        let id = alice.pull(&bob, "bafy-metered").await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_starts(&id, 1).await;
        let mut provider_events = bob.channel_events(&id);

        assert!(bob.substrate.emit_progress(&id, 1024, 1));
        assert!(bob.substrate.emit_progress(&id, 1024, 1));

        let exceeded = next_event(&mut provider_events, EventCode::DataLimitExceeded).await;
        assert_eq!(exceeded.channel.status, ChannelStatus::Paused);
        assert_eq!(exceeded.channel.sent_bytes, 2048);
        assert!(exceeded.channel.pause.awaiting_voucher);
        next_event(&mut requester_events, EventCode::PauseRemote).await;
        alice.wait_status(&id, ChannelStatus::Paused).await;
        wait_until(|| bob.substrate.is_paused(&id)).await;

        alice.manager.send_voucher(&id, voucher("top-up")).await.unwrap();

        let provider = bob.wait_status(&id, ChannelStatus::Transferring).await;
        assert_eq!(provider.data_limit, Some(8192));
        assert!(!provider.pause.awaiting_voucher);
        wait_until(|| !bob.substrate.is_paused(&id)).await;
        let result = next_event(&mut requester_events, EventCode::NewVoucherResult).await;
        assert!(!result.channel.pause.remote);
        alice.wait_status(&id, ChannelStatus::Accepted).await;

        assert!(bob.substrate.emit_progress(&id, 1024, 1));
        let err = bob.manager.send_voucher(&id, voucher("wrong side")).await.unwrap_err();
        assert!(matches!(err, DataTransferError::InvalidState { .. }));
    }
}
