//! Notifications triggered from the HTTP side, observed on live connections.

use pretty_assertions::assert_eq;
use serde_json::json;

use chat_realtime::domain::{ServerEvent, UserId};

use crate::common::{user_set, Harness};

#[tokio::test]
async fn test_group_created_reaches_online_members_only() {
    let harness = Harness::new();
    harness.users.add("A", "Alice");
    harness.users.add("B", "Bob");
    let mut a = harness.connect_as("A").await;
    let mut b = harness.connect_as("B").await;

    harness
        .notifier
        .group_created("Weekend", &UserId::from("A"), &user_set(&["B", "C"]));

    assert_eq!(a.next_event().await, ServerEvent::alert("Welcome to Weekend group"));
    a.assert_idle();
    assert_eq!(b.next_event().await, ServerEvent::alert("Welcome to Weekend group"));
    assert_eq!(b.next_event().await, ServerEvent::RefetchChats {});
}

#[tokio::test]
async fn test_friend_request_notification() {
    let harness = Harness::new();
    harness.users.add("B", "Bob");
    let mut b = harness.connect_as("B").await;

    harness.notifier.friend_request_sent(&UserId::from("B"));

    assert_eq!(b.next_event().await, ServerEvent::NewRequest {});
}

#[tokio::test]
async fn test_notify_raw_rejects_unknown_kind() {
    let harness = Harness::new();
    harness.users.add("A", "Alice");
    let mut a = harness.connect_as("A").await;

    assert!(harness
        .notifier
        .notify_raw(&user_set(&["A"]), "REFRESH", json!({}))
        .is_err());
    harness
        .notifier
        .notify_raw(&user_set(&["A"]), "ALERT", json!({"text": "hello"}))
        .unwrap();

    assert_eq!(a.next_event().await, ServerEvent::alert("hello"));
    a.assert_idle();
}
