//! Connection admission.
//!
//! A connection is admitted once: its credential is verified, the identity is
//! resolved to a user record, and the resulting [`SessionContext`] is handed
//! to the session before any inbound event is read.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::{SessionContext, UserDirectory, UserId};

/// WebSocket close code for a refused credential.
pub const CLOSE_UNAUTHENTICATED: u16 = 4001;
/// WebSocket close code for a connection that never identified itself.
pub const CLOSE_AUTH_TIMEOUT: u16 = 4008;
/// WebSocket close code for an internal failure during admission.
pub const CLOSE_INTERNAL: u16 = 1011;

/// Admission failures. All of them are terminal for the connection.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error("Authentication timed out")]
    AuthTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdmissionError {
    /// Close code sent to the client.
    pub fn close_code(&self) -> u16 {
        match self {
            AdmissionError::Unauthenticated | AdmissionError::UserNotFound(_) => {
                CLOSE_UNAUTHENTICATED
            }
            AdmissionError::AuthTimeout => CLOSE_AUTH_TIMEOUT,
            AdmissionError::Internal(_) => CLOSE_INTERNAL,
        }
    }

    /// Close reason sent to the client. A missing user is not disclosed.
    pub fn client_reason(&self) -> &'static str {
        match self {
            AdmissionError::Unauthenticated | AdmissionError::UserNotFound(_) => "Unauthenticated",
            AdmissionError::AuthTimeout => "Authentication timed out",
            AdmissionError::Internal(_) => "Internal error",
        }
    }

    /// Label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::Unauthenticated => "unauthenticated",
            AdmissionError::UserNotFound(_) => "user_not_found",
            AdmissionError::AuthTimeout => "auth_timeout",
            AdmissionError::Internal(_) => "internal",
        }
    }
}

/// Verifies raw credential material and extracts the identity it names.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, raw: &str) -> Result<UserId, AdmissionError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// HS256 session-token verifier.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, raw: &str) -> Result<UserId, AdmissionError> {
        let data = decode::<Claims>(raw, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AdmissionError::Unauthenticated
        })?;

        if data.claims.sub.trim().is_empty() {
            return Err(AdmissionError::Unauthenticated);
        }

        Ok(UserId::from(data.claims.sub))
    }
}

/// Turns a credential into a session context.
pub struct Authenticator {
    verifier: Arc<dyn CredentialVerifier>,
    users: Arc<dyn UserDirectory>,
}

impl Authenticator {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, users: Arc<dyn UserDirectory>) -> Self {
        Self { verifier, users }
    }

    /// Verify `credential` and load the user it names.
    ///
    /// `None` (no credential at all) and blank credentials are refused
    /// without consulting the verifier.
    pub async fn authenticate(
        &self,
        credential: Option<&str>,
    ) -> Result<SessionContext, AdmissionError> {
        let raw = credential
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or(AdmissionError::Unauthenticated)?;

        let user_id = self.verifier.verify(raw).await?;

        let user = self
            .users
            .find_by_id(&user_id)
            .await
            .map_err(|e| AdmissionError::Internal(e.to_string()))?
            .ok_or(AdmissionError::UserNotFound(user_id))?;

        tracing::debug!(user_id = %user.id, "Connection authenticated");

        Ok(SessionContext::from(user))
    }
}
