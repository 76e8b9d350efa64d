//! # Chat Realtime Library
//!
//! Real-time presence and event fan-out for a chat application backend:
//! - WebSocket endpoint that admits authenticated connections
//! - Connection registry mapping each online user to one live connection
//! - Chat-scoped fan-out of messages, delivery alerts and typing signals
//! - Background persistence of messages to PostgreSQL
//! - Notifications for state changes made over HTTP
//!
//! ## Architecture
//!
//! - **Domain Layer**: Identifiers, message shapes, wire events, collaborator traits
//! - **Application Layer**: Admission, per-connection sessions, notifier
//! - **Infrastructure Layer**: Registry and router, PostgreSQL, metrics
//! - **Presentation Layer**: WebSocket handler and operational HTTP routes
//!
//! ## Module Structure
//!
//! ```text
//! chat_realtime/
//! +-- config/         Configuration management
//! +-- domain/         Value objects, entities, events, collaborator traits
//! +-- application/    Authenticator, chat session, notifier
//! +-- infrastructure/ Registry, router, repositories, metrics
//! +-- presentation/   HTTP routes and WebSocket handler
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types and contracts
pub mod domain;

// Application layer - Session and admission logic
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
