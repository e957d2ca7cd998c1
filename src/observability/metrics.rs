//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_rate_limited_total` (counter): rejected attempts by limiter key
//! - `gate_verifications_total` (counter): verification attempts by result
//! - `gate_logins_total` (counter): login attempts by result
//! - `gate_csp_policies_total` (counter): policies built

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rate_limited(key: &str) {
    metrics::counter!("gate_rate_limited_total", "key" => key.to_string()).increment(1);
}

pub fn record_verification(result: &'static str) {
    metrics::counter!("gate_verifications_total", "result" => result).increment(1);
}

pub fn record_login(result: &'static str) {
    metrics::counter!("gate_logins_total", "result" => result).increment(1);
}

pub fn record_policy_built() {
    metrics::counter!("gate_csp_policies_total").increment(1);
}
