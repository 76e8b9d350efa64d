//! WebSocket Connection Handler
//!
//! Upgrades `/socket` requests and adapts the socket to the connection
//! driver: a writer task drains the outbound queue into the socket while the
//! driver consumes inbound frames.

use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::connection::{drive, Inbound};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::Outbound;
use crate::presentation::http::extractors::HandshakeCredential;
use crate::startup::AppState;

/// How long the writer gets to flush a final close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    HandshakeCredential(credential): HandshakeCredential,
) -> Response {
    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, credential))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, credential: Option<String>) {
    let _connected = metrics::ConnectionStateGuard::enter("connected");

    // Split socket for concurrent read/write
    let (mut sender, receiver) = socket.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    // Spawn task to forward messages from channel to WebSocket
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let message = match outbound {
                Outbound::Event(event) => match serde_json::to_string(event.as_ref()) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(event = %event.kind(), error = %e, "Failed to serialize event");
                        continue;
                    }
                },
                Outbound::Close { code, reason } => {
                    let _ = sender
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: Utf8Bytes::from_static(reason),
                        })))
                        .await;
                    break;
                }
            };

            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let inbound = Box::pin(receiver.filter_map(|frame| async move {
        match frame {
            Ok(Message::Text(text)) => Some(Inbound::Text(text.as_str().to_owned())),
            Ok(Message::Close(_)) => Some(Inbound::Close),
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket error");
                Some(Inbound::Close)
            }
            // Ping/pong is answered by axum; binary frames are not part of the protocol.
            Ok(_) => None,
        }
    }));

    let result = drive(
        inbound,
        tx.clone(),
        credential,
        &state.authenticator,
        state.chat_services.clone(),
        Duration::from_secs(state.settings.websocket.auth_timeout_secs),
    )
    .await;

    if let Err(e) = result {
        let _ = tx.send(Outbound::Close {
            code: e.close_code(),
            reason: e.client_reason(),
        });
    }
    drop(tx);

    let abort = writer.abort_handle();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        abort.abort();
    }
}
