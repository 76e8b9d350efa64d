//! # Domain Value Objects
//!
//! Immutable identifier types.

mod ids;

pub use ids::*;
