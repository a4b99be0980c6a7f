//! Logs and metrics.
//!
//! ```text
//! tracing events ─▶ logging.rs (EnvFilter + fmt) ─▶ stdout
//! counters/histograms ─▶ metrics.rs ─▶ Prometheus scrape endpoint
//! ```
//!
//! Each proxied request logs under its `x-request-id`; metrics are labelled
//! by application, never by path.

pub mod logging;
pub mod metrics;
