//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauges
//! - Events delivered / failed per event kind
//! - Message persistence failures
//! - Connection admission failures by reason

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

const NAMESPACE: &str = "chat_realtime";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace(NAMESPACE),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Events handed to a connection's outbound queue
pub static EVENTS_DELIVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_delivered_total", "Events queued to live connections")
            .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create EVENTS_DELIVERED_TOTAL metric")
});

/// Events that could not be queued because the connection was closing
pub static EVENT_DELIVERY_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "event_delivery_failures_total",
            "Events dropped because the target connection was gone",
        )
        .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create EVENT_DELIVERY_FAILURES_TOTAL metric")
});

/// Durable writes that failed after the live fan-out
pub static MESSAGE_PERSIST_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "message_persist_failures_total",
            "Messages delivered live but not persisted",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create MESSAGE_PERSIST_FAILURES_TOTAL metric")
});

/// Connections refused during admission
pub static ADMISSION_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("admission_failures_total", "Connections refused at admission")
            .namespace(NAMESPACE),
        &["reason"],
    )
    .expect("Failed to create ADMISSION_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_DELIVERED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DELIVERED_TOTAL");
    registry
        .register(Box::new(EVENT_DELIVERY_FAILURES_TOTAL.clone()))
        .expect("Failed to register EVENT_DELIVERY_FAILURES_TOTAL");
    registry
        .register(Box::new(MESSAGE_PERSIST_FAILURES_TOTAL.clone()))
        .expect("Failed to register MESSAGE_PERSIST_FAILURES_TOTAL");
    registry
        .register(Box::new(ADMISSION_FAILURES_TOTAL.clone()))
        .expect("Failed to register ADMISSION_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Track a connection entering or leaving a state
pub fn connection_state_changed(state: &str, delta: f64) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&[state])
        .add(delta);
}

/// Counts one connection in `state` for as long as it is alive.
///
/// The gauge is decremented on drop, so a task aborted mid-connection still
/// gives its slot back.
#[must_use = "the connection leaves the state when the guard is dropped"]
pub struct ConnectionStateGuard {
    state: &'static str,
}

impl ConnectionStateGuard {
    pub fn enter(state: &'static str) -> Self {
        connection_state_changed(state, 1.0);
        Self { state }
    }
}

impl Drop for ConnectionStateGuard {
    fn drop(&mut self) {
        connection_state_changed(self.state, -1.0);
    }
}

pub fn record_delivery(event: &str) {
    EVENTS_DELIVERED_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_delivery_failure(event: &str) {
    EVENT_DELIVERY_FAILURES_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_persist_failure() {
    MESSAGE_PERSIST_FAILURES_TOTAL.inc();
}

pub fn record_admission_failure(reason: &str) {
    ADMISSION_FAILURES_TOTAL.with_label_values(&[reason]).inc();
}
