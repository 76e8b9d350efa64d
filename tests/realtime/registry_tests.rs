//! Connection registry under concurrent mutation and lookup.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use chat_realtime::domain::{ConnectionId, UserId};
use chat_realtime::infrastructure::realtime::{ConnectionHandle, ConnectionRegistry, Outbound};

const USERS: usize = 32;
const RECONNECTS: usize = 50;

fn user(index: usize) -> UserId {
    UserId::from(format!("user-{index}").as_str())
}

/// One user's successive connections, oldest first.
fn connections(
    count: usize,
) -> (Vec<ConnectionHandle>, Vec<mpsc::UnboundedReceiver<Outbound>>) {
    (0..count)
        .map(|_| {
            let (tx, rx) = mpsc::unbounded_channel();
            (ConnectionHandle::new(ConnectionId::generate(), tx), rx)
        })
        .unzip()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reconnects_keep_latest_connection() {
    let registry = Arc::new(ConnectionRegistry::new());
    let everyone: HashSet<UserId> = (0..USERS).map(user).collect();
    let writers_done = Arc::new(AtomicBool::new(false));
    let mut receivers = Vec::new();
    let mut expected = Vec::new();
    let mut writers = JoinSet::new();

    for index in 0..USERS {
        let (handles, rx) = connections(RECONNECTS);
        receivers.extend(rx);
        let ids: Vec<ConnectionId> = handles.iter().map(ConnectionHandle::id).collect();
        let latest = ids[RECONNECTS - 1];
        expected.push((user(index), latest));

        // Reconnects, in order.
        let reconnecting = Arc::clone(&registry);
        writers.spawn(async move {
            for handle in handles {
                reconnecting.register(user(index), handle);
                tokio::task::yield_now().await;
            }
        });

        // Earlier connections closing, in any order relative to the reconnects.
        let closing = Arc::clone(&registry);
        writers.spawn(async move {
            for stale in ids.into_iter().take(RECONNECTS - 1).rev() {
                closing.unregister_connection(&user(index), stale);
                tokio::task::yield_now().await;
            }
        });
    }

    let mut readers = JoinSet::new();
    for _ in 0..4 {
        let registry = Arc::clone(&registry);
        let everyone = everyone.clone();
        let writers_done = Arc::clone(&writers_done);
        readers.spawn(async move {
            let mut lookups = 0usize;
            loop {
                let resolved = registry.resolve(&everyone);
                assert!(resolved.len() <= USERS);
                lookups += 1;
                if writers_done.load(Ordering::Acquire) {
                    return lookups;
                }
                tokio::task::yield_now().await;
            }
        });
    }

    while let Some(result) = writers.join_next().await {
        result.unwrap();
    }
    writers_done.store(true, Ordering::Release);
    while let Some(result) = readers.join_next().await {
        assert!(result.unwrap() > 0);
    }

    assert_eq!(registry.len(), USERS);
    for (user_id, latest) in &expected {
        let current = registry.connection_id(user_id);
        assert_eq!(current, Some(*latest), "user {user_id} lost its latest connection");
    }
    drop(receivers);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disconnects_leave_only_live_users() {
    let registry = Arc::new(ConnectionRegistry::new());
    let everyone: HashSet<UserId> = (0..USERS).map(user).collect();
    let (handles, _receivers) = connections(USERS);
    let ids: Vec<ConnectionId> = handles.iter().map(ConnectionHandle::id).collect();

    for (index, handle) in handles.into_iter().enumerate() {
        registry.register(user(index), handle);
    }

    let mut tasks = JoinSet::new();
    for (index, id) in ids.iter().copied().enumerate().filter(|(index, _)| index % 2 == 0) {
        let registry = Arc::clone(&registry);
        tasks.spawn(async move {
            assert!(registry.unregister_connection(&user(index), id));
        });
    }
    for _ in 0..USERS {
        let registry = Arc::clone(&registry);
        let everyone = everyone.clone();
        tasks.spawn(async move {
            let resolved = registry.resolve(&everyone);
            assert!(resolved.len() >= USERS / 2);
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let live: HashSet<ConnectionId> = registry
        .resolve(&everyone)
        .iter()
        .map(ConnectionHandle::id)
        .collect();
    let expected: HashSet<ConnectionId> = ids
        .iter()
        .copied()
        .enumerate()
        .filter(|(index, _)| index % 2 == 1)
        .map(|(_, id)| id)
        .collect();
    assert_eq!(live, expected);
}
