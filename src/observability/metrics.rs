//! Metrics collection and exposition.
//!
//! # Metrics
//! - `faucet_claims_total` (counter): claim attempts by outcome
//! - `faucet_verifications_total` (counter): human verification results
//! - `faucet_submissions_total` (counter): transfers by network and status
//! - `faucet_submission_duration_seconds` (histogram): submission latency
//! - `faucet_cooldown_entries` (gauge): tracked (network, address) pairs
//!
//! Without an installed recorder every call here is a no-op, which keeps
//! tests free of global state.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the terminal outcome of one claim attempt.
pub fn record_claim(outcome: &'static str) {
    counter!("faucet_claims_total", "outcome" => outcome).increment(1);
}

/// Record a human verification result.
pub fn record_verification(passed: bool) {
    let result = if passed { "passed" } else { "rejected" };
    counter!("faucet_verifications_total", "result" => result).increment(1);
}

/// Record one transfer submission on a network.
pub fn record_submission(network: &str, success: bool, started: Instant) {
    let status = if success { "accepted" } else { "failed" };
    counter!(
        "faucet_submissions_total",
        "network" => network.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("faucet_submission_duration_seconds", "network" => network.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// Record the number of entries held by the cooldown tracker.
pub fn record_cooldown_entries(count: usize) {
    gauge!("faucet_cooldown_entries").set(count as f64);
}
