//! Chat membership contract.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{ChatId, UserId};
use crate::shared::error::AppError;

/// Authoritative chat membership, read fresh for every action.
///
/// Implementations must not cache: fan-out targets are always derived from
/// the membership at the moment of the triggering action.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Members of a chat, or `Ok(None)` if the chat does not exist.
    async fn members(&self, chat_id: &ChatId) -> Result<Option<HashSet<UserId>>, AppError>;
}
