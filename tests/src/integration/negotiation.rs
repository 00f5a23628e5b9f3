//! # Channel Negotiation
//!
//! Open → validate → accept or reject, and a full pull running to
//! completion on both sides.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{
        drain, settle, voucher, wait_until, PeerBuilder, ScriptedValidator,
    };
    use dt_03_network::MemoryNetwork;
    use dt_05_channel_manager::DataTransferApi;
    use shared_types::{ChannelStatus, Cid, EventCode, Selector};

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_pull_completes_on_both_sides() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").plan(1024, 3).start(&net).await;
        let alice = PeerBuilder::new("alice").plan(1024, 3).start(&net).await;
        let mut alice_events = alice.events();
        let mut bob_events = bob.events();

        let id = alice.pull(&bob, "bafy-root").await;

        let done = alice.wait_status(&id, ChannelStatus::Completed).await;
        bob.wait_status(&id, ChannelStatus::Completed).await;
        assert_eq!(done.transferred_bytes(), 3 * 1024);
        assert_eq!(done.transferred_blocks(), 3);
        assert_eq!(done.received_bytes, 3 * 1024);
        assert_eq!(bob.state(&id).await.sent_bytes, 3 * 1024);

        settle().await;
        let codes: Vec<_> = drain(&mut alice_events).into_iter().map(|e| e.code).collect();
        let count = |code: EventCode| codes.iter().filter(|c| **c == code).count();
        assert_eq!(codes.first(), Some(&EventCode::Open));
        assert_eq!(codes.last(), Some(&EventCode::Complete));
        assert_eq!(count(EventCode::Accept), 1);
        assert_eq!(count(EventCode::DataReceived), 3);
        assert_eq!(count(EventCode::Completing), 1);
        assert_eq!(count(EventCode::Complete), 1);
        assert_eq!(count(EventCode::DataSent), 0);

        let provider_codes: Vec<_> = drain(&mut bob_events).into_iter().map(|e| e.code).collect();
        assert_eq!(provider_codes.first(), Some(&EventCode::Accept));
        assert_eq!(
            provider_codes.iter().filter(|c| **c == EventCode::DataSent).count(),
            3
        );
        assert_eq!(bob.validator.calls(), 1);
    }

    #[tokio::test]
    async fn test_finished_channels_release_their_actors() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").plan(256, 2).start(&net).await;
        let alice = PeerBuilder::new("alice").plan(256, 2).start(&net).await;

        let mut ids = Vec::new();
        for cid in ["bafy-a", "bafy-b", "bafy-c", "bafy-d"] {
            ids.push(alice.pull(&bob, cid).await);
        }
        for id in &ids {
            alice.wait_status(id, ChannelStatus::Completed).await;
            bob.wait_status(id, ChannelStatus::Completed).await;
        }

        wait_until(|| alice.manager.active_channels() == 0).await;
        wait_until(|| bob.manager.active_channels() == 0).await;

        // Still answered from the store, and late calls do not pin an actor.
        assert_eq!(alice.state(&ids[0]).await.status, ChannelStatus::Completed);
        alice.manager.cancel(&ids[0]).await.unwrap();
        assert_eq!(alice.state(&ids[0]).await.status, ChannelStatus::Completed);
        wait_until(|| alice.manager.active_channels() == 0).await;
    }

    #[tokio::test]
    async fn test_push_starts_both_transports() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.push(&bob, "bafy-push").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;
        bob.wait_starts(&id, 1).await;

        let sender = alice.substrate.last_request(&id).unwrap();
        let receiver = bob.substrate.last_request(&id).unwrap();
        assert!(sender.is_sender);
        assert!(!receiver.is_sender);
        assert_eq!(sender.resume_from, None);

        let in_progress = alice.manager.in_progress_channels().await.unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].channel_id, id);
    }

    // =========================================================================
    // REFUSALS
    // =========================================================================

    #[tokio::test]
    async fn test_rejected_push_ends_both_sides() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob")
            .validator(ScriptedValidator::reject_all())
            .start(&net)
            .await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.push(&bob, "bafy-refused").await;

        alice.wait_status(&id, ChannelStatus::Rejected).await;
        let provider = bob.wait_status(&id, ChannelStatus::Failed).await;
        assert!(!provider.message.is_empty());
        assert_eq!(bob.validator.calls(), 1);
        assert_eq!(alice.substrate.start_count(&id), 0);
        assert_eq!(bob.substrate.start_count(&id), 0);

        // Cancelling a channel that already ended changes nothing.
        alice.manager.cancel(&id).await.unwrap();
        assert_eq!(alice.state(&id).await.status, ChannelStatus::Rejected);
    }

    #[tokio::test]
    async fn test_unknown_voucher_type_is_rejected_without_validation() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob")
            .without_voucher_types()
            .start(&net)
            .await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;

        alice.wait_status(&id, ChannelStatus::Rejected).await;
        bob.wait_status(&id, ChannelStatus::Failed).await;
        assert_eq!(bob.validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_request_off_the_wire() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        alice.kv.set_fail_writes(true);
        let err = alice
            .manager
            .open_pull(&bob.id, voucher("pull"), Cid::new("bafy-root"), Selector::all())
            .await
            .unwrap_err();
        assert!(err.is_store_error());

        settle().await;
        assert_eq!(bob.validator.calls(), 0);
        assert!(bob.manager.list_channels().await.unwrap().is_empty());
        assert!(alice.manager.in_progress_channels().await.unwrap().is_empty());

        alice.kv.set_fail_writes(false);
        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
    }
}
