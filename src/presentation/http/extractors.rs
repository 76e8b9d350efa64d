//! Custom Extractors
//!
//! Pulls the session credential out of a WebSocket upgrade request.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use axum_extra::headers::{authorization::Bearer, Authorization, Cookie, HeaderMapExt};
use serde::Deserialize;

use crate::startup::AppState;

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    token: Option<String>,
}

/// Credential carried by the handshake, if any.
///
/// Sources are checked in order: session cookie, `Authorization: Bearer`,
/// `?token=` query parameter. A request with none of them still upgrades;
/// the client is then expected to send `IDENTIFY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeCredential(pub Option<String>);

impl HandshakeCredential {
    pub fn from_parts(parts: &Parts, cookie_name: &str) -> Self {
        let from_cookie = parts
            .headers
            .typed_get::<Cookie>()
            .and_then(|cookie| cookie.get(cookie_name).map(str::to_string));

        let credential = from_cookie
            .or_else(|| {
                parts
                    .headers
                    .typed_get::<Authorization<Bearer>>()
                    .map(|Authorization(bearer)| bearer.token().to_string())
            })
            .or_else(|| {
                Query::<ConnectQuery>::try_from_uri(&parts.uri)
                    .ok()
                    .and_then(|Query(query)| query.token)
            })
            .filter(|token| !token.trim().is_empty());

        Self(credential)
    }
}

impl FromRequestParts<AppState> for HandshakeCredential {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, &state.settings.jwt.cookie_name))
    }
}
