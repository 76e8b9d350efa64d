//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod connection;
pub mod handler;

pub use connection::{drive, Inbound};
pub use handler::ws_handler;
