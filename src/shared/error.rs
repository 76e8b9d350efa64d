//! Application Error Types
//!
//! Errors raised by the storage collaborators. Nothing here reaches a client
//! directly: sessions log them, and admission maps them to a close code.

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
