//! Real-time protocol vocabulary.
//!
//! Every frame on the wire is `{"event": KIND, "data": PAYLOAD}`. The set of
//! kinds is closed: anything outside it is rejected at the boundary instead
//! of being passed through as an opaque string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::domain::{ChatId, MessageView};

/// Kinds of events pushed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Alert,
    RefetchChats,
    NewMessage,
    NewMessageAlert,
    StartTyping,
    StopTyping,
    NewRequest,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Alert,
        EventKind::RefetchChats,
        EventKind::NewMessage,
        EventKind::NewMessageAlert,
        EventKind::StartTyping,
        EventKind::StopTyping,
        EventKind::NewRequest,
    ];

    /// Wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Alert => "ALERT",
            EventKind::RefetchChats => "REFETCH_CHATS",
            EventKind::NewMessage => "NEW_MESSAGE",
            EventKind::NewMessageAlert => "NEW_MESSAGE_ALERT",
            EventKind::StartTyping => "START_TYPING",
            EventKind::StopTyping => "STOP_TYPING",
            EventKind::NewRequest => "NEW_REQUEST",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventKind(s.to_string()))
    }
}

/// Errors raised when an event crosses a system boundary.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    #[error("Invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

/// Event pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "ALERT")]
    Alert { text: String },

    #[serde(rename = "REFETCH_CHATS")]
    RefetchChats {},

    #[serde(rename = "NEW_MESSAGE")]
    NewMessage {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
        message: MessageView,
    },

    #[serde(rename = "NEW_MESSAGE_ALERT")]
    NewMessageAlert {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
    },

    #[serde(rename = "START_TYPING")]
    StartTyping {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
    },

    #[serde(rename = "STOP_TYPING")]
    StopTyping {
        #[serde(rename = "chatId")]
        chat_id: ChatId,
    },

    #[serde(rename = "NEW_REQUEST")]
    NewRequest {},
}

impl ServerEvent {
    pub fn alert(text: impl Into<String>) -> Self {
        ServerEvent::Alert { text: text.into() }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::Alert { .. } => EventKind::Alert,
            ServerEvent::RefetchChats {} => EventKind::RefetchChats,
            ServerEvent::NewMessage { .. } => EventKind::NewMessage,
            ServerEvent::NewMessageAlert { .. } => EventKind::NewMessageAlert,
            ServerEvent::StartTyping { .. } => EventKind::StartTyping,
            ServerEvent::StopTyping { .. } => EventKind::StopTyping,
            ServerEvent::NewRequest {} => EventKind::NewRequest,
        }
    }

    /// Build an event from an already-validated kind and an untyped payload.
    ///
    /// The payload must match the shape of `kind`.
    pub fn from_parts(kind: EventKind, payload: serde_json::Value) -> Result<Self, EventError> {
        serde_json::from_value(json!({ "event": kind.as_str(), "data": payload }))
            .map_err(|source| EventError::InvalidPayload { kind, source })
    }
}

/// Payload of an inbound `NEW_MESSAGE`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessagePayload {
    #[serde(rename = "chatId")]
    pub chat_id: ChatId,

    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}

/// Payload of an inbound `START_TYPING` / `STOP_TYPING`.
#[derive(Debug, Clone, Deserialize)]
pub struct TypingPayload {
    #[serde(rename = "chatId")]
    pub chat_id: ChatId,
}

/// Event sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Credential for connections that did not carry one in the handshake.
    #[serde(rename = "IDENTIFY")]
    Identify { token: String },

    #[serde(rename = "NEW_MESSAGE")]
    SendMessage(SendMessagePayload),

    #[serde(rename = "START_TYPING")]
    StartTyping(TypingPayload),

    #[serde(rename = "STOP_TYPING")]
    StopTyping(TypingPayload),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Identify { .. } => "IDENTIFY",
            ClientEvent::SendMessage(_) => "NEW_MESSAGE",
            ClientEvent::StartTyping(_) => "START_TYPING",
            ClientEvent::StopTyping(_) => "STOP_TYPING",
        }
    }
}
