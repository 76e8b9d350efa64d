//! Message Repository Implementation
//!
//! PostgreSQL implementation of the `MessageStore` trait. Attachments are
//! stored inline as a JSONB array.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DurableMessage, MessageId, MessageStore};
use crate::shared::error::AppError;

/// PostgreSQL message store.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Creates a new PgMessageStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn persist(&self, message: &DurableMessage) -> Result<MessageId, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO messages (id, content, sender_id, chat_id, attachments)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(&message.content)
        .bind(message.sender.as_str())
        .bind(message.chat.as_str())
        .bind(Json(&message.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(MessageId::from(id))
    }
}
