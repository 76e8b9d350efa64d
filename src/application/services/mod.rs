//! Application Services
//!
//! - **Authenticator**: connection admission (credential → session context)
//! - **ChatSession**: per-connection state machine and inbound event handling
//! - **Notifier**: events triggered by HTTP-side state changes

pub mod authenticator;
pub mod chat_session;
pub mod notifier;

pub use authenticator::{
    AdmissionError, Authenticator, Claims, CredentialVerifier, JwtVerifier, CLOSE_AUTH_TIMEOUT,
    CLOSE_INTERNAL, CLOSE_UNAUTHENTICATED,
};
pub use chat_session::{ChatServices, ChatSession, SessionError, SessionPhase};
pub use notifier::Notifier;
