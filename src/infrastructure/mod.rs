//! Infrastructure Layer
//!
//! Contains implementations for external concerns:
//! - In-process connection registry and event router
//! - PostgreSQL collaborators (users, chat membership, messages)
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod realtime;
pub mod repositories;
