//! # Protocol Errors
//!
//! A hand-driven peer sends messages that do not fit the channel. Each one
//! is answered with a Protocol error and leaves the stored channel as it
//! was.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{voucher, PeerBuilder, RawPeer};
    use dt_03_network::{ErrorCode, MemoryNetwork, TransferMessage};
    use dt_05_channel_manager::DataTransferApi;
    use shared_types::{ChannelId, ChannelStatus, Cid, PeerId, Selector, TransferId};
    use std::time::Duration;

    fn assert_protocol_error(message: TransferMessage, channel_id: &ChannelId) {
        match message {
            TransferMessage::Error {
                channel_id: replied,
                code: ErrorCode::Protocol,
                ..
            } => assert_eq!(&replied, channel_id),
            other => panic!("expected a protocol error, got {other:?}"),
        }
    }

    fn accept(channel_id: &ChannelId) -> TransferMessage {
        TransferMessage::Accept {
            channel_id: channel_id.clone(),
            voucher_result: None,
            paused: false,
        }
    }

    #[tokio::test]
    async fn test_out_of_place_messages_get_protocol_errors() {
        let net = MemoryNetwork::new();
        let alice = PeerBuilder::new("alice").start(&net).await;
        let mut carol = RawPeer::start("carol", &net).await;

        let pending = alice
            .manager
            .open_pull(&carol.id, voucher("first"), Cid::new("bafy-one"), Selector::all())
            .await
            .unwrap();
        assert!(matches!(carol.next_message().await, TransferMessage::Open { .. }));
        let opened = alice.wait_status(&pending, ChannelStatus::Open).await;

        // Complete before the channel was ever accepted.
        carol
            .send(&alice, TransferMessage::Complete { channel_id: pending.clone() })
            .await;
        assert_protocol_error(carol.next_message().await, &pending);
        assert_eq!(alice.state(&pending).await, opened);

        let id = alice
            .manager
            .open_pull(&carol.id, voucher("second"), Cid::new("bafy-two"), Selector::all())
            .await
            .unwrap();
        assert!(matches!(carol.next_message().await, TransferMessage::Open { .. }));
        carol.send(&alice, accept(&id)).await;
        alice.wait_status(&id, ChannelStatus::Accepted).await;
        alice.wait_starts(&id, 1).await;
        let accepted = alice.state(&id).await;

        // A second Accept for a running channel.
        carol.send(&alice, accept(&id)).await;
        assert_protocol_error(carol.next_message().await, &id);
        assert_eq!(alice.state(&id).await, accepted);

        // Vouchers only flow from the requester.
        carol
            .send(
                &alice,
                TransferMessage::Voucher {
                    channel_id: id.clone(),
                    voucher: voucher("more"),
                },
            )
            .await;
        assert_protocol_error(carol.next_message().await, &id);
        assert_eq!(alice.state(&id).await, accepted);
        assert_eq!(alice.substrate.start_count(&id), 1);

        let unknown = ChannelId::new(PeerId::new("carol"), alice.id.clone(), TransferId(99));
        carol
            .send(&alice, TransferMessage::Pause { channel_id: unknown.clone() })
            .await;
        assert_protocol_error(carol.next_message().await, &unknown);
        assert!(alice.manager.get_channel(&unknown).await.is_err());

        // Errors are never answered.
        carol
            .send(
                &alice,
                TransferMessage::error(unknown.clone(), ErrorCode::Protocol, "noise".to_string()),
            )
            .await;
        assert!(carol
            .try_next_message(Duration::from_millis(100))
            .await
            .is_none());
        assert_eq!(alice.state(&pending).await, opened);
    }
}
