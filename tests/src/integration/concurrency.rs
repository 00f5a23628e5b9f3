//! # Concurrent Operations
//!
//! Crossing opens for the same exchange, repeated cancels, and a transport
//! that keeps stalling.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{drain, settle, PeerBuilder, ScriptedValidator};
    use dt_03_network::MemoryNetwork;
    use dt_04_transport::{BlockPlan, SimulatedTransport};
    use dt_05_channel_manager::{DataTransferApi, DataTransferError};
    use shared_types::{ChannelStatus, EventCode};
    use std::time::Duration;

    #[tokio::test]
    async fn test_crossing_opens_keep_lower_channel_id() {
        let net = MemoryNetwork::new();
        let slow = || ScriptedValidator::accept_all().slow(Duration::from_millis(50));
        let alice = PeerBuilder::new("alice").validator(slow()).start(&net).await;
        let bob = PeerBuilder::new("bob").validator(slow()).start(&net).await;

        // Both describe bob sending bafy-shared to alice.
        let (pulled, pushed) = tokio::join!(
            alice.pull(&bob, "bafy-shared"),
            bob.push(&alice, "bafy-shared")
        );
        assert!(pulled.precedes(&pushed));

        let winner = alice.wait_status(&pulled, ChannelStatus::Accepted).await;
        assert_eq!(winner.channel_id, pulled);
        bob.wait_status(&pulled, ChannelStatus::Accepted).await;
        let loser = bob.wait_status(&pushed, ChannelStatus::Cancelled).await;
        assert!(!loser.message.is_empty());

        assert!(matches!(
            alice.manager.get_channel(&pushed).await,
            Err(DataTransferError::NotFound(_))
        ));
        assert_eq!(alice.validator.calls(), 0);
        assert_eq!(bob.validator.calls(), 1);
    }

    #[tokio::test]
    async fn test_open_for_accepted_exchange_is_refused() {
        let net = MemoryNetwork::new();
        let alice = PeerBuilder::new("alice").start(&net).await;
        let bob = PeerBuilder::new("bob").start(&net).await;

        // Burn alice's first transfer id so bob's push carries the lower id.
        let warmup = alice.pull(&bob, "bafy-warmup").await;
        alice.wait_status(&warmup, ChannelStatus::Accepted).await;

        let pulled = alice.pull(&bob, "bafy-shared").await;
        alice.wait_status(&pulled, ChannelStatus::Accepted).await;
        bob.wait_status(&pulled, ChannelStatus::Accepted).await;

        let pushed = bob.push(&alice, "bafy-shared").await;
        assert!(pushed.precedes(&pulled));

        let loser = bob.wait_status(&pushed, ChannelStatus::Cancelled).await;
        assert!(!loser.message.is_empty());
        assert!(matches!(
            alice.manager.get_channel(&pushed).await,
            Err(DataTransferError::NotFound(_))
        ));
        assert_eq!(alice.validator.calls(), 0);

        settle().await;
        assert_eq!(alice.state(&pulled).await.status, ChannelStatus::Accepted);
        assert_eq!(bob.state(&pulled).await.status, ChannelStatus::Accepted);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;
        let mut events = alice.channel_events(&id);

        let (first, second) = tokio::join!(alice.manager.cancel(&id), alice.manager.cancel(&id));
        first.unwrap();
        second.unwrap();
        alice.manager.cancel(&id).await.unwrap();

        assert_eq!(alice.state(&id).await.status, ChannelStatus::Cancelled);
        assert!(alice.substrate.was_cancelled(&id));
        bob.wait_status(&id, ChannelStatus::Cancelled).await;

        settle().await;
        let cancels = drain(&mut events)
            .into_iter()
            .filter(|e| e.code == EventCode::Cancel)
            .count();
        assert_eq!(cancels, 1);

        let err = alice.manager.pause(&id).await.unwrap_err();
        assert!(matches!(err, DataTransferError::InvalidState { .. }));
        assert!(alice.manager.in_progress_channels().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalls_retry_then_fail_both_sides() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;

        assert!(alice.substrate.emit_progress(&id, 100, 1));
        alice.wait_bytes(&id, 100).await;

        // Two retries, each resuming from what was already counted.
        for attempt in 2..=3 {
            assert!(alice.substrate.stall(&id, "no route to provider"));
            alice.wait_starts(&id, attempt).await;
            let retry = alice.substrate.last_request(&id).unwrap();
            assert_eq!(retry.resume_from.map(|p| p.bytes), Some(100));
        }
        assert_eq!(alice.state(&id).await.status, ChannelStatus::Transferring);

        assert!(alice.substrate.stall(&id, "no route to provider"));
        let failed = alice.wait_status(&id, ChannelStatus::Failed).await;
        assert!(failed.message.contains("no route to provider"));
        bob.wait_status(&id, ChannelStatus::Failed).await;
        assert_eq!(alice.substrate.start_count(&id), 3);
    }

    #[tokio::test]
    async fn test_channels_progress_independently() {
        let net = MemoryNetwork::new();
        let paced = || {
            SimulatedTransport::new().with_plan(BlockPlan::new(512, 4, Duration::from_millis(20)))
        };
        let bob = PeerBuilder::new("bob").substrate(paced()).start(&net).await;
        let alice = PeerBuilder::new("alice").substrate(paced()).start(&net).await;

        let first = alice.pull(&bob, "bafy-one").await;
        let second = alice.pull(&bob, "bafy-two").await;
        alice.wait_starts(&second, 1).await;
        alice.manager.pause(&second).await.unwrap();

        let done = alice.wait_status(&first, ChannelStatus::Completed).await;
        assert_eq!(done.transferred_bytes(), 4 * 512);
        let held = alice.state(&second).await;
        assert_eq!(held.status, ChannelStatus::Paused);
        assert!(held.transferred_bytes() < 4 * 512);

        alice.manager.resume(&second).await.unwrap();
        let done = alice.wait_status(&second, ChannelStatus::Completed).await;
        assert_eq!(done.transferred_bytes(), 4 * 512);
        bob.wait_status(&second, ChannelStatus::Completed).await;
    }
}
