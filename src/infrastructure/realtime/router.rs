//! Event Router
//!
//! Resolves a set of target users to their live connections and queues an
//! event on each. Delivery is fire-and-forget: offline targets are skipped
//! and a connection that cannot accept a frame is dropped from the registry.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{ServerEvent, UserId};
use crate::infrastructure::metrics;

use super::registry::{ConnectionRegistry, Outbound};

/// Close code sent when a session is ended from the server side on logout.
pub const CLOSE_NORMAL: u16 = 1000;

#[derive(Clone)]
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
}

impl EventRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every online user in `targets`.
    ///
    /// Never fails and never blocks on a slow client.
    pub fn emit(&self, targets: &HashSet<UserId>, event: ServerEvent) {
        let kind = event.kind();
        let connections = self.registry.resolve_with_owner(targets);

        if connections.is_empty() {
            tracing::trace!(event = %kind, targets = targets.len(), "No online targets");
            return;
        }

        let event = Arc::new(event);
        let mut delivered = 0usize;

        for (user_id, handle) in connections {
            match handle.send(Outbound::Event(Arc::clone(&event))) {
                Ok(()) => {
                    delivered += 1;
                    metrics::record_delivery(kind.as_str());
                }
                Err(failure) => {
                    tracing::debug!(
                        user_id = %user_id,
                        event = %kind,
                        error = %failure,
                        "Dropping closed connection"
                    );
                    metrics::record_delivery_failure(kind.as_str());
                    self.registry.unregister_connection(&user_id, handle.id());
                }
            }
        }

        tracing::debug!(
            event = %kind,
            targets = targets.len(),
            delivered,
            "Event emitted"
        );
    }

    /// Close a user's live connection, if any, and forget it.
    pub fn disconnect(&self, user_id: &UserId) -> bool {
        let Some(connection_id) = self.registry.connection_id(user_id) else {
            return false;
        };

        for handle in self.registry.resolve(&HashSet::from([user_id.clone()])) {
            handle.close(CLOSE_NORMAL, "Logged out");
        }

        let removed = self.registry.unregister_connection(user_id, connection_id);
        if removed {
            tracing::info!(user_id = %user_id, "User disconnected");
        }
        removed
    }
}
