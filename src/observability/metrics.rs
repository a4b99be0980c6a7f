//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): forwarded requests by app, status
//! - `proxy_request_duration_seconds` (histogram): latency of forwarded requests
//! - `proxy_admission_decisions_total` (counter): decisions by app, decision
//! - `proxy_config_reloads_total` (counter): reload attempts by result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op (unit tests, metrics disabled)
//! - Labels are app names and decision labels, never request paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const DURATION_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus exporter, serving scrapes on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("proxy_request_duration_seconds".to_string()),
            &DURATION_BUCKETS,
        )?
        .install()?;

    describe_counter!("proxy_requests_total", "Requests forwarded to a backend");
    describe_histogram!(
        "proxy_request_duration_seconds",
        "Time from admission to backend response"
    );
    describe_counter!(
        "proxy_admission_decisions_total",
        "Admission decisions taken by the breaker"
    );
    describe_counter!("proxy_config_reloads_total", "Configuration reload attempts");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a forwarded request.
pub fn record_request(app: &str, status: u16, start: Instant) {
    counter!("proxy_requests_total",
        "app" => app.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds",
        "app" => app.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an admission decision.
pub fn record_decision(app: &str, decision: &'static str) {
    counter!("proxy_admission_decisions_total",
        "app" => app.to_string(),
        "decision" => decision
    )
    .increment(1);
}

/// Record a configuration reload.
pub fn record_config_reload(success: bool) {
    counter!("proxy_config_reloads_total",
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
}
