//! Message and typing fan-out through live connections.

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::assert_ok;

use chat_realtime::domain::{ChatId, DurableMessage, ServerEvent, UserId};

use crate::common::{eventually, Harness};

fn harness_with_chat(members: &[&str]) -> Harness {
    let harness = Harness::new();
    harness.users.add("A", "Alice");
    harness.users.add("B", "Bob");
    harness.users.add("C", "Cleo");
    harness.chats.set_members("C1", members);
    harness
}

#[tokio::test]
async fn test_message_reaches_peer_and_is_persisted() {
    let harness = harness_with_chat(&["A", "B"]);
    let mut a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": "hi"}}));

    let live_id = match b.next_event().await {
        ServerEvent::NewMessage { chat_id, message } => {
            assert_eq!(chat_id, ChatId::from("C1"));
            assert_eq!(message.content, "hi");
            assert_eq!(message.sender.id, UserId::from("A"));
            assert_eq!(message.sender.name, "Alice");
            assert_eq!(message.chat_id, ChatId::from("C1"));
            message.id
        }
        other => panic!("expected NEW_MESSAGE, got {:?}", other),
    };
    assert_eq!(
        b.next_event().await,
        ServerEvent::NewMessageAlert { chat_id: ChatId::from("C1") }
    );

    // The sender gets its own copy as well.
    assert!(matches!(a.next_event().await, ServerEvent::NewMessage { .. }));

    eventually(|| harness.store.records().len() == 1).await;
    assert_eq!(
        harness.store.records(),
        vec![DurableMessage {
            id: live_id,
            content: "hi".into(),
            sender: UserId::from("A"),
            chat: ChatId::from("C1"),
            attachments: vec![],
        }]
    );
}

#[tokio::test]
async fn test_sender_display_fields_come_from_user_record() {
    let harness = Harness::new();
    let name = harness.users.add_random("D");
    harness.users.add("B", "Bob");
    harness.chats.set_members("C2", &["D", "B"]);
    let d = harness.connect_as("D").await;
    let mut b = harness.connect_as("B").await;

    d.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C2", "message": "yo"}}));

    match b.next_event().await {
        ServerEvent::NewMessage { message, .. } => {
            assert_eq!(message.sender.name, name);
            assert_eq!(message.sender.avatar, None);
        }
        other => panic!("expected NEW_MESSAGE, got {:?}", other),
    }
}

#[tokio::test]
async fn test_each_recipient_sees_message_before_alert() {
    let harness = harness_with_chat(&["A", "B", "C"]);
    let a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;
    let mut c = harness.connect_as("C").await;

    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": "one"}}));
    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": "two"}}));

    for client in [&mut b, &mut c] {
        for expected in ["one", "two"] {
            match client.next_event().await {
                ServerEvent::NewMessage { message, .. } => assert_eq!(message.content, expected),
                other => panic!("expected NEW_MESSAGE, got {:?}", other),
            }
            assert!(matches!(
                client.next_event().await,
                ServerEvent::NewMessageAlert { .. }
            ));
        }
    }
}

#[tokio::test]
async fn test_persistence_failure_still_delivers() {
    let harness = harness_with_chat(&["A", "B"]);
    harness.store.fail_writes();
    let a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": "hi"}}));

    assert!(matches!(b.next_event().await, ServerEvent::NewMessage { .. }));
    assert!(matches!(b.next_event().await, ServerEvent::NewMessageAlert { .. }));

    // The connection keeps working after the failed write.
    a.send(json!({"event": "START_TYPING", "data": {"chatId": "C1"}}));
    assert_eq!(
        b.next_event().await,
        ServerEvent::StartTyping { chat_id: ChatId::from("C1") }
    );
    assert!(harness.store.records().is_empty());
}

#[tokio::test]
async fn test_typing_reaches_peer_once_without_persisting() {
    let harness = harness_with_chat(&["A", "B"]);
    let mut a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    a.send(json!({"event": "START_TYPING", "data": {"chatId": "C1"}}));

    assert_eq!(
        b.next_event().await,
        ServerEvent::StartTyping { chat_id: ChatId::from("C1") }
    );

    a.send(json!({"event": "STOP_TYPING", "data": {"chatId": "C1"}}));
    assert_eq!(
        b.next_event().await,
        ServerEvent::StopTyping { chat_id: ChatId::from("C1") }
    );

    b.assert_idle();
    a.assert_idle();
    assert!(harness.store.records().is_empty());
}

#[tokio::test]
async fn test_client_member_list_is_ignored() {
    let harness = harness_with_chat(&["A", "B"]);
    let a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;
    let mut c = harness.connect_as("C").await;

    a.send(json!({
        "event": "START_TYPING",
        "data": {"chatId": "C1", "members": ["A", "B", "C"]}
    }));

    assert!(matches!(b.next_event().await, ServerEvent::StartTyping { .. }));
    c.assert_idle();
}

#[tokio::test]
async fn test_offline_members_are_skipped() {
    let harness = harness_with_chat(&["A", "B", "C"]);
    let a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": "hi"}}));

    assert!(matches!(b.next_event().await, ServerEvent::NewMessage { .. }));
    assert!(matches!(b.next_event().await, ServerEvent::NewMessageAlert { .. }));
    eventually(|| harness.store.records().len() == 1).await;
}

#[tokio::test]
async fn test_bad_frames_do_not_close_active_connection() {
    let harness = harness_with_chat(&["A", "B"]);
    let a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    a.send_text("{not json");
    a.send(json!({"event": "NEW_ATTACHMENT", "data": {}}));
    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "C1", "message": ""}}));
    a.send(json!({"event": "NEW_MESSAGE", "data": {"chatId": "nope", "message": "x"}}));
    a.send(json!({"event": "START_TYPING", "data": {"chatId": "C1"}}));

    assert_eq!(
        b.next_event().await,
        ServerEvent::StartTyping { chat_id: ChatId::from("C1") }
    );
    assert!(harness.registry.is_online(&UserId::from("A")));
}

#[tokio::test]
async fn test_reconnect_moves_delivery_to_latest_connection() {
    let harness = harness_with_chat(&["A", "B"]);
    let first = harness.connect_as("A").await;
    let mut second = harness.connect_as("A").await;
    let b = harness.connect_as("B").await;

    // The displaced connection closing must not evict the new one.
    assert_ok!(first.close().await);
    assert!(harness.registry.is_online(&UserId::from("A")));

    b.send(json!({"event": "START_TYPING", "data": {"chatId": "C1"}}));

    assert_eq!(
        second.next_event().await,
        ServerEvent::StartTyping { chat_id: ChatId::from("C1") }
    );
}

#[tokio::test]
async fn test_disconnect_unregisters() {
    let harness = harness_with_chat(&["A", "B"]);
    let a = harness.connect_as("A").await;

    assert_ok!(a.close().await);

    assert!(!harness.registry.is_online(&UserId::from("A")));
    assert!(harness.registry.is_empty());
}
