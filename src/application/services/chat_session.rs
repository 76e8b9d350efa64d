//! Per-connection chat session.
//!
//! A session moves through `Connecting → Authenticated → Active → Closed`.
//! Only an `Active` session reacts to inbound events, and leaving `Active`
//! unregisters the connection exactly once. A connection closed from the
//! server side (logout) stops acting immediately, even before the driver
//! moves the session to `Closed`.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::domain::{
    ChatDirectory, ChatId, ClientEvent, ConnectionId, MessageStore, MessageView,
    SendMessagePayload, SenderView, ServerEvent, SessionContext, TypingPayload, UserId,
};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::{ConnectionHandle, EventRouter};
use crate::shared::error::AppError;
use crate::shared::validation;

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

/// Errors from handling a single inbound event. None of them close the
/// connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session is not active")]
    NotActive,

    #[error("Chat {0} not found")]
    ChatNotFound(ChatId),

    #[error("User {user_id} is not a member of chat {chat_id}")]
    NotAMember { user_id: UserId, chat_id: ChatId },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Failed to resolve chat membership: {0}")]
    Membership(#[source] AppError),
}

/// Shared collaborators every session uses.
#[derive(Clone)]
pub struct ChatServices {
    pub router: EventRouter,
    pub chats: Arc<dyn ChatDirectory>,
    pub messages: Arc<dyn MessageStore>,
}

pub struct ChatSession {
    services: ChatServices,
    phase: SessionPhase,
    context: Option<SessionContext>,
    connection_id: Option<ConnectionId>,
    close_signal: Option<CancellationToken>,
}

impl ChatSession {
    pub fn new(services: ChatServices) -> Self {
        Self {
            services,
            phase: SessionPhase::Connecting,
            context: None,
            connection_id: None,
            close_signal: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Attach the identity resolved at admission.
    pub fn authenticate(&mut self, context: SessionContext) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Connecting {
            return Err(SessionError::NotActive);
        }
        self.context = Some(context);
        self.phase = SessionPhase::Authenticated;
        Ok(())
    }

    /// Register the connection and start accepting events.
    pub fn activate(&mut self, handle: ConnectionHandle) -> Result<(), SessionError> {
        let Some(context) = self.context.as_ref() else {
            return Err(SessionError::NotActive);
        };
        if self.phase != SessionPhase::Authenticated {
            return Err(SessionError::NotActive);
        }

        self.connection_id = Some(handle.id());
        self.close_signal = Some(handle.close_signal());
        self.services
            .router
            .registry()
            .register(context.user_id().clone(), handle);
        self.phase = SessionPhase::Active;
        Ok(())
    }

    /// Dispatch one inbound event.
    pub async fn handle(&mut self, event: ClientEvent) -> Result<(), SessionError> {
        match event {
            ClientEvent::SendMessage(payload) => {
                // Persistence runs detached; nothing here waits on it.
                self.send_message(payload).await.map(drop)
            }
            ClientEvent::StartTyping(payload) => self.start_typing(payload).await,
            ClientEvent::StopTyping(payload) => self.stop_typing(payload).await,
            ClientEvent::Identify { .. } => {
                tracing::debug!("Ignoring IDENTIFY on an active session");
                Ok(())
            }
        }
    }

    /// Fan a new message out to the chat and persist it in the background.
    ///
    /// Both events are queued before persistence is dispatched. The returned
    /// handle resolves once the store write has finished (or failed).
    pub async fn send_message(
        &self,
        payload: SendMessagePayload,
    ) -> Result<JoinHandle<()>, SessionError> {
        let context = self.active_context()?;

        payload
            .validate()
            .map_err(|e| SessionError::InvalidPayload(validation::describe(&e)))?;

        let members = self.members(context, &payload.chat_id).await?;
        // The connection may have been closed while membership was loading.
        self.active_context()?;

        let view = MessageView::new_text(
            payload.chat_id.clone(),
            SenderView::from(context),
            payload.message,
        );
        let durable = view.to_durable();
        let message_id = view.id;

        self.services.router.emit(
            &members,
            ServerEvent::NewMessage {
                chat_id: payload.chat_id.clone(),
                message: view,
            },
        );
        self.services.router.emit(
            &members,
            ServerEvent::NewMessageAlert {
                chat_id: payload.chat_id.clone(),
            },
        );

        tracing::debug!(
            user_id = %context.user_id(),
            chat_id = %payload.chat_id,
            message_id = %message_id,
            recipients = members.len(),
            "Message fanned out"
        );

        let store = Arc::clone(&self.services.messages);
        Ok(tokio::spawn(async move {
            if let Err(e) = store.persist(&durable).await {
                metrics::record_persist_failure();
                tracing::error!(
                    chat_id = %durable.chat,
                    sender = %durable.sender,
                    message_id = %message_id,
                    error = %e,
                    "Failed to persist delivered message"
                );
            }
        }))
    }

    pub async fn start_typing(&self, payload: TypingPayload) -> Result<(), SessionError> {
        let chat_id = payload.chat_id;
        self.typing(ServerEvent::StartTyping { chat_id: chat_id.clone() }, &chat_id)
            .await
    }

    pub async fn stop_typing(&self, payload: TypingPayload) -> Result<(), SessionError> {
        let chat_id = payload.chat_id;
        self.typing(ServerEvent::StopTyping { chat_id: chat_id.clone() }, &chat_id)
            .await
    }

    /// Leave `Active` and unregister. Safe to call more than once.
    pub fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }

        if self.phase == SessionPhase::Active {
            if let (Some(context), Some(connection_id)) = (&self.context, self.connection_id) {
                self.services
                    .router
                    .registry()
                    .unregister_connection(context.user_id(), connection_id);
                tracing::debug!(
                    user_id = %context.user_id(),
                    connection_id = %connection_id,
                    "Session closed"
                );
            }
        }

        self.phase = SessionPhase::Closed;
    }

    async fn typing(&self, event: ServerEvent, chat_id: &ChatId) -> Result<(), SessionError> {
        let context = self.active_context()?;
        let mut members = self.members(context, chat_id).await?;
        self.active_context()?;
        members.remove(context.user_id());

        self.services.router.emit(&members, event);
        Ok(())
    }

    fn active_context(&self) -> Result<&SessionContext, SessionError> {
        match (&self.phase, &self.context) {
            (SessionPhase::Active, Some(context)) if !self.closed_by_server() => Ok(context),
            _ => Err(SessionError::NotActive),
        }
    }

    fn closed_by_server(&self) -> bool {
        self.close_signal
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Current members of `chat_id`, read fresh. The caller must be one.
    async fn members(
        &self,
        context: &SessionContext,
        chat_id: &ChatId,
    ) -> Result<HashSet<UserId>, SessionError> {
        if chat_id.is_empty() {
            return Err(SessionError::InvalidPayload("chatId: must not be empty".into()));
        }

        let members = self
            .services
            .chats
            .members(chat_id)
            .await
            .map_err(SessionError::Membership)?
            .ok_or_else(|| SessionError::ChatNotFound(chat_id.clone()))?;

        if !members.contains(context.user_id()) {
            return Err(SessionError::NotAMember {
                user_id: context.user_id().clone(),
                chat_id: chat_id.clone(),
            });
        }

        Ok(members)
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}
