//! Outbound notifications for state changes made over HTTP.
//!
//! Request handlers call these after they commit a change, so users who did
//! not perform the action still learn about it. Delivery has the same
//! best-effort semantics as [`EventRouter::emit`].

use std::collections::HashSet;

use crate::domain::{ChatId, EventError, EventKind, MessageView, ServerEvent, UserId};
use crate::infrastructure::realtime::EventRouter;

#[derive(Clone)]
pub struct Notifier {
    router: EventRouter,
}

impl Notifier {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }

    /// Deliver `event` to `targets` as-is.
    pub fn notify(&self, targets: &HashSet<UserId>, event: ServerEvent) {
        self.router.emit(targets, event);
    }

    /// Boundary variant for callers that carry the event kind as a string.
    ///
    /// The kind must be one of the closed set and the payload must match its
    /// shape; nothing is delivered otherwise.
    pub fn notify_raw(
        &self,
        targets: &HashSet<UserId>,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<(), EventError> {
        let kind: EventKind = kind.parse()?;
        let event = ServerEvent::from_parts(kind, payload)?;
        self.notify(targets, event);
        Ok(())
    }

    pub fn group_created(&self, name: &str, creator: &UserId, members: &HashSet<UserId>) {
        let mut everyone = members.clone();
        everyone.insert(creator.clone());

        self.notify(&everyone, ServerEvent::alert(format!("Welcome to {name} group")));

        let mut others = members.clone();
        others.remove(creator);
        self.notify(&others, ServerEvent::RefetchChats {});
    }

    /// `names` is the already-joined display names of the new members.
    pub fn members_added(&self, names: &str, all_members: &HashSet<UserId>) {
        self.notify(
            all_members,
            ServerEvent::alert(format!("{names} has been added in the group")),
        );
        self.notify(all_members, ServerEvent::RefetchChats {});
    }

    pub fn member_removed(&self, name: &str, remaining: &HashSet<UserId>) {
        self.notify(
            remaining,
            ServerEvent::alert(format!("{name} was removed from the group")),
        );
    }

    pub fn member_left(&self, name: &str, remaining: &HashSet<UserId>) {
        self.notify(
            remaining,
            ServerEvent::alert(format!("User {name} has left the group")),
        );
    }

    pub fn chat_renamed(&self, members: &HashSet<UserId>) {
        self.notify(members, ServerEvent::RefetchChats {});
    }

    pub fn chat_deleted(&self, members: &HashSet<UserId>) {
        self.notify(members, ServerEvent::RefetchChats {});
    }

    pub fn friend_request_sent(&self, receiver: &UserId) {
        self.notify(&HashSet::from([receiver.clone()]), ServerEvent::NewRequest {});
    }

    pub fn friend_request_accepted(&self, sender: &UserId, receiver: &UserId) {
        self.notify(
            &HashSet::from([sender.clone(), receiver.clone()]),
            ServerEvent::RefetchChats {},
        );
    }

    /// Fan out a message whose attachments were uploaded over HTTP.
    pub fn attachments_sent(&self, chat_id: &ChatId, members: &HashSet<UserId>, view: MessageView) {
        self.notify(
            members,
            ServerEvent::NewMessage {
                chat_id: chat_id.clone(),
                message: view,
            },
        );
        self.notify(
            members,
            ServerEvent::NewMessageAlert {
                chat_id: chat_id.clone(),
            },
        );
    }
}
