//! Metrics collection and exposition.
//!
//! # Metrics
//! - `link_mapping_decisions_total` (counter): redirects issued, by source
//!   (`mapping` or `fallback`)
//! - `link_mapping_errors_total` (counter): swallowed resolution errors, by kind
//! - `link_mapping_requests_total` (counter): site requests by method, status
//! - `link_mapping_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call
//!   is a no-op
//! - Prometheus exposition is opt-in through configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Count a redirect issued by the engine.
pub fn record_decision(source: &'static str) {
    metrics::counter!("link_mapping_decisions_total", "source" => source).increment(1);
}

/// Count a resolution error that was logged and swallowed.
pub fn record_error(kind: &'static str) {
    metrics::counter!("link_mapping_errors_total", "kind" => kind).increment(1);
}

/// Record a completed site request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "link_mapping_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "link_mapping_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_decision("mapping");
        record_error("chain_too_long");
        record_request("GET", 404, Instant::now());
    }
}
