//! # Domain Entities
//!
//! - **UserRecord / SessionContext**: who owns a connection
//! - **MessageView / DurableMessage**: the two shapes of one message
//!
//! ## Collaborator Traits
//!
//! `UserDirectory`, `ChatDirectory` and `MessageStore` are owned by the CRUD
//! side of the application. They are defined here and implemented in the
//! infrastructure layer, following the dependency inversion principle.

mod chat;
mod message;
mod user;

pub use chat::ChatDirectory;
pub use message::{Attachment, DurableMessage, MessageStore, MessageView, SenderView};
pub use user::{SessionContext, UserDirectory, UserRecord};

#[cfg(test)]
pub use chat::MockChatDirectory;
#[cfg(test)]
pub use message::MockMessageStore;
#[cfg(test)]
pub use user::MockUserDirectory;
