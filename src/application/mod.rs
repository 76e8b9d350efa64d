//! Application Layer
//!
//! Orchestrates the real-time core: admitting connections, running each
//! connection's session, and notifying users of HTTP-side changes.

pub mod services;
