//! Chat Membership Repository
//!
//! Reads chat membership from `chats` and `chat_members`. Every call goes to
//! the database; nothing is cached.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{ChatDirectory, ChatId, UserId};
use crate::shared::error::AppError;

#[derive(Clone)]
pub struct PgChatDirectory {
    pool: PgPool,
}

impl PgChatDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatDirectory for PgChatDirectory {
    async fn members(&self, chat_id: &ChatId) -> Result<Option<HashSet<UserId>>, AppError> {
        // One row per member, or a single NULL row for a chat with no members.
        // No rows at all means the chat does not exist.
        let rows = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT cm.user_id
            FROM chats c
            LEFT JOIN chat_members cm ON cm.chat_id = c.id
            WHERE c.id = $1
            "#,
        )
        .bind(chat_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(rows.into_iter().flatten().map(UserId::from).collect()))
    }
}
