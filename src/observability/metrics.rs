//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guestbook_rate_limited_total` (counter): denied requests, labelled by `window`
//! - `guestbook_messages_accepted_total` (counter): stored messages
//! - `guestbook_messages_rejected_total` (counter): posts rejected as invalid input
//! - `guestbook_messages_stored` (gauge): messages currently retained
//! - `guestbook_rate_limit_clients` (gauge): clients holding rate limit state

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_rate_limited(window: &'static str) {
    ::metrics::counter!("guestbook_rate_limited_total", "window" => window).increment(1);
}

pub fn record_message_accepted(stored: usize) {
    ::metrics::counter!("guestbook_messages_accepted_total").increment(1);
    ::metrics::gauge!("guestbook_messages_stored").set(stored as f64);
}

pub fn record_message_rejected() {
    ::metrics::counter!("guestbook_messages_rejected_total").increment(1);
}

pub fn record_tracked_clients(clients: usize) {
    ::metrics::gauge!("guestbook_rate_limit_clients").set(clients as f64);
}
