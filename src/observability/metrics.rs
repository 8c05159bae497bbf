//! Metrics collection and exposition.
//!
//! # Metrics
//! - `spa_requests_total` (counter): requests by method, status
//! - `spa_request_duration_seconds` (histogram): handler latency
//! - `spa_push_attempts_total` (counter): assets pushed
//! - `spa_connection_transitions_total` (counter): transitions by state
//! - `spa_live_connections` (gauge): connections in the registry
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are kept low-cardinality (no paths)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::net::ConnState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start_time: Instant) {
    ::metrics::counter!(
        "spa_requests_total",
        "method" => method_label(method),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("spa_request_duration_seconds")
        .record(start_time.elapsed().as_secs_f64());
}

/// Label for a request method; extension methods collapse to `other`.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "other",
    }
}

pub fn record_push(assets: usize) {
    ::metrics::counter!("spa_push_attempts_total").increment(assets as u64);
}

pub fn record_transition(state: ConnState) {
    ::metrics::counter!("spa_connection_transitions_total", "state" => state.as_str())
        .increment(1);
}

pub fn set_live_connections(count: usize) {
    ::metrics::gauge!("spa_live_connections").set(count as f64);
}
