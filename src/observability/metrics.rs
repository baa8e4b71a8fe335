//! Metrics collection and exposition.
//!
//! # Metrics
//! - `challenge_phase_transitions_total` (counter): phase entries, by `phase`
//! - `challenge_run_phase` (gauge): ordinal of the current phase
//! - `challenge_store_writes_total` (counter): write outcomes, by `outcome`
//!   (`accepted`, `conflict`, `rejected`)
//! - `challenge_probe_attempts_total` (counter): probe outcomes, by `outcome`
//!   (`reachable`, `status`, `transport`, `timeout`)

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::rollout::Phase;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_phase(phase: Phase) {
    counter!("challenge_phase_transitions_total", "phase" => phase.as_str()).increment(1);
    gauge!("challenge_run_phase").set(phase.ordinal() as f64);
}

pub fn record_store_write(outcome: &'static str) {
    counter!("challenge_store_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_probe_attempt(outcome: &'static str) {
    counter!("challenge_probe_attempts_total", "outcome" => outcome).increment(1);
}
