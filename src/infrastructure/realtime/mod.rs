//! In-process connection tracking and event fan-out.

mod registry;
mod router;

pub use registry::{ConnectionHandle, ConnectionRegistry, DeliveryFailure, Outbound};
pub use router::{EventRouter, CLOSE_NORMAL};
