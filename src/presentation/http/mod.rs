//! HTTP surface: router, handlers and extractors.

pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
