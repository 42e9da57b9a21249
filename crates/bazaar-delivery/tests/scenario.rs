//! End-to-end: one node sends, the other receives, lists, and marks read.

mod support;

use bazaar_common::models::{ChannelType, SortDirection};
use bazaar_delivery::{MessageClass, SendParams};
use support::{Node, NOW, WALLET};

#[tokio::test]
async fn send_list_and_mark_read() {
    let a = Node::new().await;
    let b = Node::new().await;
    let sender = a.identity().await;
    let reader = b.identity().await;

    let params = SendParams {
        wallet: WALLET.into(),
        sender: sender.address.clone(),
        receiver: reader.address.clone(),
        channel: "abc123".into(),
        channel_type: ChannelType::Listing,
        body: "M1".into(),
        class: MessageClass::Free,
        subscriber: Some(sender.id),
    };
    let transport_id = a.outbound.send(params).await.unwrap();
    let item = a.transport.delivered(&transport_id);
    assert!(b.processor.process(&item).await.unwrap().accepted);

    assert!(b.service.follow(reader.id, "abc123", ChannelType::Listing).await.unwrap());

    let page = b
        .service
        .list_messages(reader.id, "abc123", ChannelType::Listing, 20, SortDirection::Desc, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].transport_id, transport_id);
    assert_eq!(page[0].sender, sender.address);
    assert!(!page[0].is_own);
    assert!(!page[0].is_read);

    let summaries = b.service.list_channels(reader.id, None).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].has_unread);

    assert!(b.service.set_read(reader.id, "abc123", ChannelType::Listing, NOW).await.unwrap());

    let page = b
        .service
        .list_messages(reader.id, "abc123", ChannelType::Listing, 20, SortDirection::Desc, None)
        .await
        .unwrap();
    assert!(page[0].is_read);
    // newest == last read is not unread
    let summaries = b.service.list_channels(reader.id, Some(ChannelType::Listing)).await.unwrap();
    assert!(!summaries[0].has_unread);

    // the sender's own copy is marked as theirs
    let own = a
        .service
        .list_messages(sender.id, "abc123", ChannelType::Listing, 20, SortDirection::Desc, None)
        .await
        .unwrap();
    assert!(own[0].is_own);
}

#[tokio::test]
async fn read_state_never_regresses() {
    let a = Node::new().await;
    let b = Node::new().await;
    let sender = a.identity().await;
    let reader = b.identity().await;

    for body in ["first", "second"] {
        let params = SendParams {
            wallet: WALLET.into(),
            sender: sender.address.clone(),
            receiver: reader.address.clone(),
            channel: "abc123".into(),
            channel_type: ChannelType::Order,
            body: body.into(),
            class: MessageClass::Free,
            subscriber: None,
        };
        let transport_id = a.outbound.send(params).await.unwrap();
        assert!(b.processor.pipeline().receive(&a.transport.delivered(&transport_id)).await);
        a.clock.advance(1_000);
    }
    b.service.follow(reader.id, "abc123", ChannelType::Order).await.unwrap();

    b.service.set_read(reader.id, "abc123", ChannelType::Order, NOW + 1_000).await.unwrap();
    b.service.set_read(reader.id, "abc123", ChannelType::Order, NOW).await.unwrap();

    let summaries = b.service.list_channels(reader.id, None).await.unwrap();
    assert_eq!(summaries[0].last_read, NOW + 1_000);
    assert_eq!(summaries[0].participant_count, 1);
}

#[tokio::test]
async fn same_object_resolves_to_one_channel() {
    let a = Node::new().await;
    let sender = a.identity().await;

    for _ in 0..2 {
        let params = SendParams {
            wallet: WALLET.into(),
            sender: sender.address.clone(),
            receiver: "bob".into(),
            channel: "abc123".into(),
            channel_type: ChannelType::Listing,
            body: "ping".into(),
            class: MessageClass::Free,
            subscriber: Some(sender.id),
        };
        a.outbound.send(params).await.unwrap();
    }

    let summaries = a.service.list_channels(sender.id, None).await.unwrap();
    assert_eq!(summaries.len(), 1);
    let page = a
        .service
        .list_messages(sender.id, "abc123", ChannelType::Listing, 20, SortDirection::Asc, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn follow_and_label_operations() {
    let a = Node::new().await;
    let me = a.identity().await;

    // nothing to follow yet
    assert!(!a.service.follow(me.id, "nothing", ChannelType::Listing).await.unwrap());
    assert!(a.service.unfollow(me.id, "nothing", ChannelType::Listing).await.unwrap());
    assert!(!a.service.set_read(me.id, "nothing", ChannelType::Listing, NOW).await.unwrap());
    assert!(a
        .service
        .list_messages(me.id, "nothing", ChannelType::Listing, 10, SortDirection::Desc, None)
        .await
        .unwrap()
        .is_empty());

    let labelled = a.service.update_participant_label("carol", Some("Carol")).await.unwrap();
    assert_eq!(labelled.label.as_deref(), Some("Carol"));
    assert_eq!(a.service.list_known_participants().await.unwrap().len(), 1);
    a.service.update_participant_label("carol", None).await.unwrap();
    assert!(a.service.list_known_participants().await.unwrap().is_empty());

    assert!(a.service.list_messages(999, "x", ChannelType::Listing, 1, SortDirection::Asc, None).await.is_err());
}
