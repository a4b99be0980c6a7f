//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::load_balancer::LoadBalanceMethod;
use crate::resilience::timeline::{TimelineConfig, DEFAULT_BUCKETS, DEFAULT_BUCKET_SECS};

/// Failure ratio above which a route rejects requests, unless overridden.
pub const DEFAULT_RATIO: f64 = 0.3;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Admission defaults and tracker geometry.
    pub breaker: BreakerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    /// Applications, selected by the request `Host`.
    pub apps: Vec<AppConfig>,
}

impl ProxyConfig {
    /// Insert `app`, replacing an existing application of the same name.
    pub fn upsert_app(&mut self, app: AppConfig) {
        match self
            .apps
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(&app.name))
        {
            Some(existing) => *existing = app,
            None => self.apps.push(app),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole request deadline, enforced by the serving layer.
    pub request_secs: u64,

    /// Deadline for the backend call; expiry is reported as a 502.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// Threshold used when neither the route nor the app sets one.
    pub default_ratio: f64,

    /// Width of one tracker bucket in seconds.
    pub bucket_secs: u64,

    /// Number of buckets in each tracker ring.
    pub buckets: usize,
}

impl BreakerConfig {
    pub fn timeline(&self) -> TimelineConfig {
        TimelineConfig {
            bucket_secs: self.bucket_secs,
            buckets: self.buckets,
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            default_ratio: DEFAULT_RATIO,
            bucket_secs: DEFAULT_BUCKET_SECS,
            buckets: DEFAULT_BUCKETS,
        }
    }
}

/// One application: a host name, its backends and its routes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Host name requests are matched against (case-insensitive).
    pub name: String,

    #[serde(default)]
    pub load_balance_method: LoadBalanceMethod,

    /// Application-wide failure ratio threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    /// Answer 404 instead of redirecting on a trailing-slash mismatch.
    #[serde(default)]
    pub disable_tsr: bool,

    /// Body sent with 429 responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendConfig {
    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Weight for weighted load balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Route pattern with its accepted methods.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Pattern such as `/user/:name` or `/static/*file`.
    pub path: String,

    /// Method names, case-insensitive.
    pub methods: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
