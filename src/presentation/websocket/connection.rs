//! Transport-independent connection driver.
//!
//! Runs one connection from admission to close against a stream of inbound
//! frames and an outbound queue. The axum handler adapts a real socket to
//! this shape; tests drive it with plain channels.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::application::services::{AdmissionError, Authenticator, ChatServices, ChatSession};
use crate::domain::{ClientEvent, ConnectionId, SessionContext};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::{ConnectionHandle, Outbound};

/// A frame read from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Close,
}

/// Run one connection until the client goes away.
///
/// Returns `Err` only for admission failures; the caller is expected to close
/// the transport with the error's close code. Once admitted, the connection
/// ends when the inbound stream does or when the server closes it (logout).
/// In the latter case the close frame is already queued and frames still
/// arriving from the client are not read.
pub async fn drive<S>(
    mut inbound: S,
    outbound: mpsc::UnboundedSender<Outbound>,
    handshake_credential: Option<String>,
    authenticator: &Authenticator,
    services: ChatServices,
    auth_timeout: Duration,
) -> Result<(), AdmissionError>
where
    S: Stream<Item = Inbound> + Unpin,
{
    let connection_id = ConnectionId::generate();
    let mut session = ChatSession::new(services);

    let admitted = timeout(
        auth_timeout,
        admit(&mut inbound, handshake_credential, authenticator),
    )
    .await
    .unwrap_or(Err(AdmissionError::AuthTimeout));

    let context = match admitted {
        Ok(context) => context,
        Err(e) => {
            metrics::record_admission_failure(e.reason());
            tracing::info!(connection_id = %connection_id, error = %e, "Connection refused");
            return Err(e);
        }
    };

    let user_id = context.user_id().clone();
    let handle = ConnectionHandle::new(connection_id, outbound);
    let close_signal = handle.close_signal();
    session
        .authenticate(context)
        .and_then(|()| session.activate(handle))
        .map_err(|e| AdmissionError::Internal(e.to_string()))?;

    let _authenticated = metrics::ConnectionStateGuard::enter("authenticated");
    tracing::info!(user_id = %user_id, connection_id = %connection_id, "User connected");

    loop {
        let frame = tokio::select! {
            biased;
            _ = close_signal.cancelled() => {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    "Connection closed by server"
                );
                break;
            }
            frame = inbound.next() => frame,
        };

        let text = match frame {
            Some(Inbound::Text(text)) => text,
            Some(Inbound::Close) | None => break,
        };

        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Dropping malformed frame"
                );
                continue;
            }
        };

        let name = event.name();
        if let Err(e) = session.handle(event).await {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                event = name,
                error = %e,
                "Event rejected"
            );
        }
    }

    session.close();
    tracing::info!(user_id = %user_id, connection_id = %connection_id, "User disconnected");

    Ok(())
}

/// Resolve the connection's identity, waiting for `IDENTIFY` if the
/// handshake carried no credential.
async fn admit<S>(
    inbound: &mut S,
    handshake_credential: Option<String>,
    authenticator: &Authenticator,
) -> Result<SessionContext, AdmissionError>
where
    S: Stream<Item = Inbound> + Unpin,
{
    if let Some(credential) = handshake_credential {
        return authenticator.authenticate(Some(&credential)).await;
    }

    while let Some(frame) = inbound.next().await {
        match frame {
            Inbound::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::Identify { token }) => {
                    return authenticator.authenticate(Some(&token)).await;
                }
                Ok(other) => {
                    tracing::debug!(event = other.name(), "Ignoring event before admission");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed frame before admission");
                }
            },
            Inbound::Close => break,
        }
    }

    Err(AdmissionError::Unauthenticated)
}
