//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hadb_probes_total` (counter): probes by target, outcome
//! - `hadb_target_state` (gauge): 0=UP, 1=DOWN, 2=DEAD
//! - `hadb_remediations_total` (counter): remediation runs by target
//! - `hadb_malformed_requests_total` (counter): requests naming no known target
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Exporter is optional and off by default

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::{HealthState, ProbeResult};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(target_id: &str, result: ProbeResult) {
    counter!(
        "hadb_probes_total",
        "target" => target_id.to_string(),
        "outcome" => result.as_str()
    )
    .increment(1);
}

pub fn record_state(target_id: &str, state: HealthState) {
    gauge!("hadb_target_state", "target" => target_id.to_string()).set(state.as_gauge());
}

pub fn record_remediation(target_id: &str) {
    counter!("hadb_remediations_total", "target" => target_id.to_string()).increment(1);
}

pub fn record_malformed_request() {
    counter!("hadb_malformed_requests_total").increment(1);
}
