//! # Restart Handshakes
//!
//! The requester restarts with `Restart`. The responder asks for one with
//! `RestartExisting` and then accepts the requester's `Restart` without
//! revalidating.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{next_event, PeerBuilder, ScriptedValidator};
    use dt_03_network::MemoryNetwork;
    use dt_04_transport::ResumePoint;
    use dt_05_channel_manager::{DataTransferApi, DataTransferError};
    use shared_types::{ChannelStatus, EventCode};

    #[tokio::test]
    async fn test_requester_restart_resumes_from_counters() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;
        for _ in 0..3 {
            assert!(alice.substrate.emit_progress(&id, 100, 1));
        }
        alice.wait_bytes(&id, 300).await;
        let mut provider_events = bob.channel_events(&id);

        alice.manager.restart(&id).await.unwrap();

        let restarted = next_event(&mut provider_events, EventCode::Restart).await;
        assert_eq!(restarted.channel.status, ChannelStatus::Restarting);
        next_event(&mut provider_events, EventCode::Accept).await;

        alice.wait_starts(&id, 2).await;
        bob.wait_starts(&id, 2).await;
        let request = alice.substrate.last_request(&id).unwrap();
        assert_eq!(request.resume_from, Some(ResumePoint::new(300, 3)));

        let state = alice.wait_status(&id, ChannelStatus::Accepted).await;
        assert_eq!(state.transferred_bytes(), 300);

        assert!(alice.substrate.emit_progress(&id, 100, 1));
        let state = alice.wait_bytes(&id, 400).await;
        assert_eq!(state.status, ChannelStatus::Transferring);
    }

    #[tokio::test]
    async fn test_responder_restart_goes_through_requester() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob").start(&net).await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.push(&bob, "bafy-root").await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;
        bob.wait_starts(&id, 1).await;
        let mut requester_events = alice.channel_events(&id);

        bob.manager.restart(&id).await.unwrap();

        let restarted = next_event(&mut requester_events, EventCode::Restart).await;
        assert_eq!(restarted.channel.status, ChannelStatus::Restarting);
        let accepted = next_event(&mut requester_events, EventCode::Accept).await;
        assert_eq!(accepted.channel.status, ChannelStatus::Accepted);

        alice.wait_starts(&id, 2).await;
        bob.wait_starts(&id, 2).await;
        bob.wait_status(&id, ChannelStatus::Accepted).await;
        // Only the open was validated.
        assert_eq!(bob.validator.calls(), 1);
    }

    #[tokio::test]
    async fn test_restart_of_finished_channel_is_refused() {
        let net = MemoryNetwork::new();
        let bob = PeerBuilder::new("bob")
            .validator(ScriptedValidator::reject_all())
            .start(&net)
            .await;
        let alice = PeerBuilder::new("alice").start(&net).await;

        let id = alice.pull(&bob, "bafy-root").await;
        alice.wait_status(&id, ChannelStatus::Rejected).await;

        let err = alice.manager.restart(&id).await.unwrap_err();
        assert!(matches!(
            err,
            DataTransferError::InvalidState {
                status: ChannelStatus::Rejected,
                ..
            }
        ));
    }
}
