//! # Recovery After Restart
//!
//! A manager rebuilt over the same store picks its channels back up. A
//! resumable transport continues from the persisted counters; anything else
//! fails the channel and waits for an explicit restart.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{next_event, PeerBuilder, TestPeer};
    use dt_03_network::MemoryNetwork;
    use dt_04_transport::{ResumePoint, SimulatedTransport};
    use dt_05_channel_manager::{DataTransferApi, Lifecycle};
    use shared_types::{ChannelId, ChannelStatus, EventCode};

    /// Alice pulls from Bob, receives 200 bytes in two blocks, then stops.
    async fn transfer_interrupted(alice: &TestPeer, bob: &TestPeer) -> ChannelId {
        let id = alice.pull(bob, "bafy-large").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;

        assert!(alice.substrate.emit_progress(&id, 100, 1));
        assert!(alice.substrate.emit_progress(&id, 100, 1));
        alice.wait_bytes(&id, 200).await;

        alice.manager.stop().await.unwrap();
        assert_eq!(alice.manager.lifecycle(), Lifecycle::Stopped);
        id
    }

    #[tokio::test]
    async fn test_resumable_channel_continues_where_it_stopped() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;
        let id = transfer_interrupted(&alice, &bob).await;

        let alice = PeerBuilder::new("alice").kv(alice.kv.clone()).build(&net);
        let mut events = alice.events();
        alice.manager.start().await.unwrap();

        let recovered = next_event(&mut events, EventCode::Recovered).await;
        assert_eq!(recovered.channel.channel_id, id);
        assert_eq!(recovered.channel.received_bytes, 200);
        assert_eq!(recovered.channel.status, ChannelStatus::Transferring);

        alice.wait_starts(&id, 1).await;
        let request = alice.substrate.last_request(&id).unwrap();
        assert_eq!(request.resume_from, Some(ResumePoint::new(200, 2)));

        assert!(alice.substrate.emit_progress(&id, 100, 1));
        assert!(alice.substrate.complete(&id));
        let done = alice.wait_status(&id, ChannelStatus::Completed).await;
        assert_eq!(done.transferred_bytes(), 300);
        assert_eq!(done.transferred_blocks(), 3);

        // Bob saw Alice finish and waits on its own side.
        bob.wait_status(&id, ChannelStatus::Completing).await;
        assert!(bob.substrate.complete(&id));
        bob.wait_status(&id, ChannelStatus::Completed).await;
    }

    #[tokio::test]
    async fn test_non_resumable_channel_fails_then_restarts_from_zero() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;
        let id = transfer_interrupted(&alice, &bob).await;

        let alice = PeerBuilder::new("alice")
            .kv(alice.kv.clone())
            .substrate(SimulatedTransport::non_resumable())
            .start(&net)
            .await;

        let failed = alice.wait_status(&id, ChannelStatus::Failed).await;
        assert_eq!(failed.received_bytes, 200);
        assert_eq!(alice.substrate.start_count(&id), 0);
        assert!(alice.manager.in_progress_channels().await.unwrap().is_empty());

        alice.manager.restart(&id).await.unwrap();
        bob.wait_starts(&id, 2).await;
        alice.wait_starts(&id, 1).await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;

        // The substrate starts over; the replayed prefix is not counted twice.
        let request = alice.substrate.last_request(&id).unwrap();
        assert_eq!(request.resume_from, None);
        assert!(alice.substrate.emit_progress(&id, 300, 3));
        let state = alice.wait_bytes(&id, 300).await;
        assert_eq!(state.transferred_bytes(), 300);
        assert_eq!(state.transferred_blocks(), 3);
        assert_eq!(state.status, ChannelStatus::Transferring);
    }

    #[tokio::test]
    async fn test_stop_releases_transport_but_keeps_status() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;
        let id = transfer_interrupted(&alice, &bob).await;

        assert!(alice.substrate.was_cancelled(&id));
        assert!(!alice.substrate.emit_progress(&id, 100, 1));
        assert!(!alice.substrate.complete(&id));

        let reopened = PeerBuilder::new("alice").kv(alice.kv.clone()).start(&net).await;
        let state = reopened.state(&id).await;
        assert_eq!(state.received_bytes, 200);
        assert_eq!(state.status, ChannelStatus::Transferring);
    }

    #[tokio::test]
    async fn test_stopped_manager_refuses_calls_and_keeps_channels() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;
        let id = transfer_interrupted(&alice, &bob).await;

        assert!(alice.manager.get_channel(&id).await.is_err());
        assert!(alice.manager.start().await.is_err());

        let reopened = PeerBuilder::new("alice").kv(alice.kv.clone()).start(&net).await;
        let channels = reopened.manager.list_channels().await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].channel_id, id);

        // New channels continue the persisted transfer ids.
        let next = reopened.pull(&bob, "bafy-other").await;
        assert!(id.precedes(&next));
    }
}
