//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_webhooks_total` (counter): webhook requests by response status
//! - `guard_webhook_duration_seconds` (histogram): end-to-end latency
//! - `guard_verifications_total` (counter): verdicts by outcome
//! - `guard_range_refreshes_total` (counter): refreshes by trigger/result
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Refresh trigger label distinguishes the periodic path from the
//!   on-miss lazy path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and start the scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed webhook request.
pub fn record_webhook(status: u16, start: Instant) {
    counter!("guard_webhooks_total", "status" => status.to_string()).increment(1);
    histogram!("guard_webhook_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record one origin verification verdict.
pub fn record_verification(trusted: bool) {
    let outcome = if trusted { "trusted" } else { "untrusted" };
    counter!("guard_verifications_total", "outcome" => outcome).increment(1);
}

/// Record one range refresh attempt from either refresh path.
pub fn record_refresh(trigger: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("guard_range_refreshes_total", "trigger" => trigger, "result" => result)
        .increment(1);
}
