//! Repository Implementations
//!
//! PostgreSQL implementations of the collaborator traits defined in the
//! domain layer.
//!
//! - **PgUserDirectory** - user lookup at connection admission
//! - **PgChatDirectory** - authoritative chat membership
//! - **PgMessageStore** - durable message records

pub mod chat_repository;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatDirectory;
pub use message_repository::PgMessageStore;
pub use user_repository::PgUserDirectory;
