//! User record and session context.
//!
//! The user store itself belongs to the account subsystem; the real-time core
//! only needs to look a user up once, at connection admission.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::shared::error::AppError;

/// The subset of a user document the real-time core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,

    /// Display name shown next to messages
    pub name: String,

    /// URL of the user's avatar image
    pub avatar_url: Option<String>,
}

/// Identity attached to a connection for its whole lifetime.
///
/// Built once from the [`UserRecord`] at admission and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_id: UserId,
    display_name: String,
    avatar: Option<String>,
}

impl SessionContext {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }
}

impl From<UserRecord> for SessionContext {
    fn from(user: UserRecord) -> Self {
        Self {
            user_id: user.id,
            display_name: user.name,
            avatar: user.avatar_url,
        }
    }
}

/// Lookup of users by identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by id. `Ok(None)` means the user no longer exists.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, AppError>;
}
