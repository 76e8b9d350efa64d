//! Connection Registry
//!
//! Maps each online user to the one connection that currently receives their
//! events. The registry is an owned component: it is created at startup,
//! shared through `AppState`, and cleared at shutdown.
//!
//! Latest registration wins. A user who connects a second time replaces the
//! previous mapping; the displaced connection is not closed and simply stops
//! receiving events.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{ConnectionId, ServerEvent, UserId};

/// Instruction queued to a connection's writer task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialize and send an event frame.
    Event(Arc<ServerEvent>),
    /// Send a close frame and stop writing.
    Close { code: u16, reason: &'static str },
}

/// The connection could not accept the frame (its writer is gone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Connection {0} is closed")]
pub struct DeliveryFailure(pub ConnectionId);

/// Sending half of a live connection.
///
/// Clones share one close signal: once any clone is closed, the connection's
/// driver stops reading client frames.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<Outbound>,
    close_signal: CancellationToken,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id,
            sender,
            close_signal: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting for the socket.
    pub fn send(&self, message: Outbound) -> Result<(), DeliveryFailure> {
        self.sender.send(message).map_err(|_| DeliveryFailure(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// End the connection from the server side: queue a close frame and
    /// signal the driver.
    pub fn close(&self, code: u16, reason: &'static str) {
        let _ = self.sender.send(Outbound::Close { code, reason });
        self.close_signal.cancel();
    }

    /// Fires once [`ConnectionHandle::close`] has been called on any clone.
    pub fn close_signal(&self) -> CancellationToken {
        self.close_signal.clone()
    }

    pub fn is_server_closed(&self) -> bool {
        self.close_signal.is_cancelled()
    }
}

/// User → live connection mapping.
///
/// Mutations on an entry are exclusive (they take the shard's write lock);
/// `resolve` only takes read locks and runs concurrently with other lookups.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `handle` as the connection for `user_id`.
    ///
    /// Returns the connection that was displaced, if any.
    pub fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let connection_id = handle.id();
        let previous = self.connections.insert(user_id.clone(), handle);

        match &previous {
            Some(old) if old.id() != connection_id => tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                displaced = %old.id(),
                "Connection registered, replacing previous connection"
            ),
            _ => tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection registered"
            ),
        }

        previous
    }

    /// Remove whatever mapping `user_id` has. No-op when absent.
    pub fn unregister(&self, user_id: &UserId) -> bool {
        let removed = self.connections.remove(user_id).is_some();
        if removed {
            tracing::debug!(user_id = %user_id, "Connection unregistered");
        }
        removed
    }

    /// Remove the mapping only if it still points at `connection_id`.
    ///
    /// A connection that was displaced by a newer one must not evict its
    /// replacement when it finally closes.
    pub fn unregister_connection(&self, user_id: &UserId, connection_id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(user_id, |_, handle| handle.id() == connection_id)
            .is_some();
        if removed {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection unregistered"
            );
        }
        removed
    }

    /// Live connections for the given users. Offline users are skipped.
    pub fn resolve(&self, user_ids: &HashSet<UserId>) -> Vec<ConnectionHandle> {
        user_ids
            .iter()
            .filter_map(|user_id| self.connections.get(user_id).map(|entry| entry.value().clone()))
            .collect()
    }

    /// Live connections paired with their owners.
    pub(crate) fn resolve_with_owner(&self, user_ids: &HashSet<UserId>) -> Vec<(UserId, ConnectionHandle)> {
        user_ids
            .iter()
            .filter_map(|user_id| {
                self.connections
                    .get(user_id)
                    .map(|entry| (user_id.clone(), entry.value().clone()))
            })
            .collect()
    }

    pub fn connection_id(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.connections.get(user_id).map(|entry| entry.id())
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Drop every mapping. Called once at shutdown.
    pub fn clear(&self) {
        let count = self.connections.len();
        self.connections.clear();
        tracing::info!(connections = count, "Connection registry cleared");
    }
}
