//! Application Startup
//!
//! Wires collaborators together, serves HTTP, and tears the connection
//! registry down on shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{Authenticator, ChatServices, JwtVerifier, Notifier};
use crate::config::Settings;
use crate::infrastructure::database;
use crate::infrastructure::realtime::{ConnectionRegistry, EventRouter};
use crate::infrastructure::repositories::{PgChatDirectory, PgMessageStore, PgUserDirectory};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub registry: Arc<ConnectionRegistry>,
    pub router: EventRouter,
    pub notifier: Notifier,
    pub authenticator: Arc<Authenticator>,
    pub chat_services: ChatServices,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble the real-time core on top of a database pool.
    pub fn new(db: PgPool, settings: Settings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = EventRouter::new(Arc::clone(&registry));

        let authenticator = Arc::new(Authenticator::new(
            Arc::new(JwtVerifier::new(&settings.jwt.secret)),
            Arc::new(PgUserDirectory::new(db.clone())),
        ));

        let chat_services = ChatServices {
            router: router.clone(),
            chats: Arc::new(PgChatDirectory::new(db.clone())),
            messages: Arc::new(PgMessageStore::new(db.clone())),
        };

        Self {
            db,
            notifier: Notifier::new(router.clone()),
            registry,
            router,
            authenticator,
            chat_services,
            settings: Arc::new(settings),
        }
    }
}

/// Build the router with middleware applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    registry: Arc<ConnectionRegistry>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        let addr = settings.server_addr();
        let state = AppState::new(db, settings);
        let registry = Arc::clone(&state.registry);
        let router = build_router(state);

        // Bind to address
        let listener = TcpListener::bind(addr.as_str()).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            registry,
        })
    }

    /// Run the server until Ctrl+C, then clear the connection registry
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.registry.clear();
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
