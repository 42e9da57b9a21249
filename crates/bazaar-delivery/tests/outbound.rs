mod support;

use bazaar_common::{
    models::ChannelType,
    BazaarError,
};
use bazaar_db::repository::{channels, follows, transport_items};
use bazaar_delivery::{canonical::envelope_digest, MessageClass, SendParams, SizeLimits};
use support::{message_count, messages_offline, messages_online, Node, NOW, WALLET};

fn params(sender: &str, receiver: &str, body: &str) -> SendParams {
    SendParams {
        wallet: WALLET.into(),
        sender: sender.into(),
        receiver: receiver.into(),
        channel: "abc123".into(),
        channel_type: ChannelType::Listing,
        body: body.into(),
        class: MessageClass::Free,
        subscriber: None,
    }
}

#[tokio::test]
async fn send_transmits_then_stores() {
    let node = Node::new().await;
    let me = node.identity().await;

    let mut p = params(&me.address, "bob", "is this still available?");
    p.subscriber = Some(me.id);
    let transport_id = node.outbound.send(p).await.unwrap();
    assert_eq!(transport_id, "relay-1");

    let sent = node.transport.sent();
    assert_eq!(sent.len(), 1);
    let (envelope, options) = &sent[0];
    assert_eq!(options.receiver, "bob");
    assert_eq!(envelope.generated, NOW);
    assert_eq!(envelope_digest(envelope).unwrap(), envelope.hash);

    assert_eq!(message_count(&node.db).await, 1);
    let channel = channels::find_channel(&node.db.pool, "abc123", ChannelType::Listing)
        .await
        .unwrap()
        .unwrap();
    assert!(follows::get_follow(&node.db.pool, channel.id, me.id).await.unwrap().is_some());

    // nothing left for the retry scheduler
    assert!(transport_items::find(&node.db.pool, "relay-1").await.unwrap().is_none());
}

#[tokio::test]
async fn store_failure_after_transmit_still_returns_transport_id() {
    let node = Node::new().await;
    let me = node.identity().await;
    messages_offline(&node.db).await;

    let transport_id = node.outbound.send(params(&me.address, "bob", "hi")).await.unwrap();
    assert_eq!(transport_id, "relay-1");
    assert_eq!(node.transport.sent().len(), 1);

    messages_online(&node.db).await;
    assert_eq!(message_count(&node.db).await, 0);
    // the whole write was rolled back
    assert!(channels::find_channel(&node.db.pool, "abc123", ChannelType::Listing)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn locked_wallet_fails_before_transmit() {
    let node = Node::new().await;
    let me = node.identity().await;
    node.wallet.lock(WALLET).await.unwrap();

    let err = node.outbound.send(params(&me.address, "bob", "hi")).await.unwrap_err();
    assert!(matches!(err, BazaarError::Signing { .. }));
    assert!(node.transport.sent().is_empty());
    assert_eq!(message_count(&node.db).await, 0);
}

#[tokio::test]
async fn unknown_sender_is_a_signing_error() {
    let node = Node::new().await;
    node.identity().await;

    let err = node.outbound.send(params("not-mine", "bob", "hi")).await.unwrap_err();
    assert_eq!(err.error_code(), "SIGNING_ERROR");
}

#[tokio::test]
async fn oversized_envelope_is_refused_per_class() {
    let node = Node::with_limits(SizeLimits { free_max_bytes: 600, paid_max_bytes: 100_000 }).await;
    let me = node.identity().await;
    let body = "x".repeat(1_000);

    let err = node.outbound.send(params(&me.address, "bob", &body)).await.unwrap_err();
    match err {
        BazaarError::Size { size, limit } => {
            assert_eq!(limit, 600);
            assert!(size > 1_000);
        }
        other => panic!("expected size error, got {other:?}"),
    }
    assert!(node.transport.sent().is_empty());

    let mut paid = params(&me.address, "bob", &body);
    paid.class = MessageClass::Paid { retention_days: 7 };
    assert!(node.outbound.send(paid).await.is_ok());
    assert_eq!(node.transport.sent()[0].1.class, MessageClass::Paid { retention_days: 7 });
}

#[tokio::test]
async fn transmit_failure_stores_nothing() {
    let node = Node::new().await;
    let me = node.identity().await;
    *node.transport.fail_with.lock().unwrap() = Some("connection refused".into());

    let err = node.outbound.send(params(&me.address, "bob", "hi")).await.unwrap_err();
    assert!(matches!(err, BazaarError::Transmit { .. }));
    assert_eq!(message_count(&node.db).await, 0);
    assert!(channels::find_channel(&node.db.pool, "abc123", ChannelType::Listing)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn malformed_relay_response_is_a_transmit_error() {
    let node = Node::new().await;
    let me = node.identity().await;
    *node.transport.status.lock().unwrap() = Some("queued".into());

    let err = node.outbound.send(params(&me.address, "bob", "hi")).await.unwrap_err();
    assert_eq!(err.error_code(), "TRANSMIT_ERROR");
    assert_eq!(message_count(&node.db).await, 0);
}

#[tokio::test]
async fn invalid_params_are_rejected_before_signing() {
    let node = Node::new().await;
    let me = node.identity().await;

    let err = node.outbound.send(params(&me.address, "", "hi")).await.unwrap_err();
    assert!(matches!(err, BazaarError::Validation { ref message } if message == "Receiver is required"));

    let err = node.outbound.send(params(&me.address, "bob", "   ")).await.unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let mut bad_channel = params(&me.address, "bob", "hi");
    bad_channel.channel = "abc/123".into();
    assert!(node.outbound.send(bad_channel).await.is_err());

    assert!(node.transport.sent().is_empty());
}
