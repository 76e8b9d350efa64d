//! Message shapes and the persistence contract.
//!
//! A single logical message exists in two shapes:
//!
//! - [`MessageView`] is pushed to live connections and carries the sender's
//!   display fields so clients can render it immediately.
//! - [`DurableMessage`] is handed to the store. Sender display fields are
//!   left out; they are resolved from the user store on read.
//!
//! Both shapes carry the same id, so clients can match a live message
//! against history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, MessageId, SessionContext, UserId};
use crate::shared::error::AppError;

/// A file uploaded to the object store and attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub public_id: String,
    pub url: String,
}

/// Sender block of the real-time view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderView {
    #[serde(rename = "_id")]
    pub id: UserId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&SessionContext> for SenderView {
    fn from(context: &SessionContext) -> Self {
        Self {
            id: context.user_id().clone(),
            name: context.display_name().to_string(),
            avatar: context.avatar().map(str::to_string),
        }
    }
}

/// Message as delivered to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(rename = "_id")]
    pub id: MessageId,

    pub content: String,

    pub sender: SenderView,

    pub chat_id: ChatId,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl MessageView {
    /// Stamp a new text message with a fresh id and the current time.
    pub fn new_text(chat_id: ChatId, sender: SenderView, content: String) -> Self {
        Self {
            id: MessageId::generate(),
            content,
            sender,
            chat_id,
            created_at: Utc::now(),
            attachments: Vec::new(),
        }
    }

    /// The record to persist for this view.
    pub fn to_durable(&self) -> DurableMessage {
        DurableMessage {
            id: self.id,
            content: self.content.clone(),
            sender: self.sender.id.clone(),
            chat: self.chat_id.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

/// Message as handed to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableMessage {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub content: String,
    pub sender: UserId,
    pub chat: ChatId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

/// Durable message storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message under its own id and return that id.
    async fn persist(&self, message: &DurableMessage) -> Result<MessageId, AppError>;
}
