//! User Repository Implementation
//!
//! PostgreSQL implementation of the `UserDirectory` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{UserDirectory, UserId, UserRecord};
use crate::shared::error::AppError;

/// Database row for the columns the real-time core reads from `users`.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    avatar_url: Option<String>,
}

impl UserRow {
    fn into_record(self) -> UserRecord {
        UserRecord {
            id: UserId::from(self.id),
            name: self.name,
            avatar_url: self.avatar_url,
        }
    }
}

/// PostgreSQL user lookup.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a new PgUserDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, avatar_url
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_record))
    }
}
