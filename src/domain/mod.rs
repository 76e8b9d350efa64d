//! # Domain Layer
//!
//! Types and contracts of the real-time core, independent of transport and
//! storage.
//!
//! ## Structure
//!
//! - **value_objects**: Identifiers (`UserId`, `ChatId`, `MessageId`, `ConnectionId`)
//! - **entities**: User/session context, message shapes, collaborator traits
//! - **events**: The closed wire vocabulary exchanged with clients
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborators (user store, chat membership, message store) are traits
//!   implemented in the infrastructure layer

pub mod entities;
pub mod events;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use events::*;
pub use value_objects::*;
