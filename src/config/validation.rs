//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ratios, bucket geometry)
//! - Check names (methods, backend addresses, duplicate apps)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Route pattern syntax and conflicts are left to the router build

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{AppConfig, ProxyConfig};
use crate::load_balancer::Backend;
use crate::resilience::timeline::MAX_BUCKETS;
use crate::routing::method::MethodSet;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("apps[{index}]: name must not be empty")]
    EmptyAppName { index: usize },

    #[error("app {0:?} is defined more than once")]
    DuplicateApp(String),

    #[error("app {0:?} has no routes")]
    NoRoutes(String),

    #[error("app {app:?}: route path must not be empty")]
    EmptyPath { app: String },

    #[error("app {app:?}: route {path:?} has no methods")]
    NoMethods { app: String, path: String },

    #[error("app {app:?}: route {path:?}: {source}")]
    UnknownMethod {
        app: String,
        path: String,
        source: crate::routing::method::UnknownMethod,
    },

    #[error("{field} must be within [0, 1], got {value}")]
    RatioOutOfRange { field: String, value: f64 },

    #[error("app {app:?}: {source}")]
    InvalidBackend {
        app: String,
        source: crate::load_balancer::InvalidBackend,
    },

    #[error("timeouts.request_secs ({request_secs}) must be greater than timeouts.upstream_secs ({upstream_secs})")]
    RequestTimeout { request_secs: u64, upstream_secs: u64 },

    #[error("breaker.bucket_secs must be greater than 0")]
    ZeroBucketSecs,

    #[error("breaker.buckets must be within 1..={max}, got {value}")]
    BucketCount { value: usize, max: usize },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // an outer deadline firing first would drop the backend's status unrecorded
    if config.timeouts.request_secs <= config.timeouts.upstream_secs {
        errors.push(ValidationError::RequestTimeout {
            request_secs: config.timeouts.request_secs,
            upstream_secs: config.timeouts.upstream_secs,
        });
    }
    check_ratio("breaker.default_ratio", Some(config.breaker.default_ratio), &mut errors);
    if config.breaker.bucket_secs == 0 {
        errors.push(ValidationError::ZeroBucketSecs);
    }
    if config.breaker.buckets == 0 || config.breaker.buckets >= MAX_BUCKETS {
        errors.push(ValidationError::BucketCount {
            value: config.breaker.buckets,
            max: MAX_BUCKETS - 1,
        });
    }

    let mut seen = HashSet::new();
    for (index, app) in config.apps.iter().enumerate() {
        if app.name.trim().is_empty() {
            errors.push(ValidationError::EmptyAppName { index });
            continue;
        }
        if !seen.insert(app.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateApp(app.name.clone()));
        }
        errors.extend(validate_app(app).err().unwrap_or_default());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate one application on its own (used by the admin upsert as well).
pub fn validate_app(app: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if app.name.trim().is_empty() {
        errors.push(ValidationError::EmptyAppName { index: 0 });
    }
    check_ratio(&format!("app {:?} ratio", app.name), app.ratio, &mut errors);

    for backend in &app.backends {
        if let Err(source) = Backend::new(&backend.address, backend.weight) {
            errors.push(ValidationError::InvalidBackend {
                app: app.name.clone(),
                source,
            });
        }
    }

    if app.routes.is_empty() {
        errors.push(ValidationError::NoRoutes(app.name.clone()));
    }
    for route in &app.routes {
        if route.path.is_empty() {
            errors.push(ValidationError::EmptyPath {
                app: app.name.clone(),
            });
        }
        if route.methods.is_empty() {
            errors.push(ValidationError::NoMethods {
                app: app.name.clone(),
                path: route.path.clone(),
            });
        } else if let Err(source) = MethodSet::parse(&route.methods) {
            errors.push(ValidationError::UnknownMethod {
                app: app.name.clone(),
                path: route.path.clone(),
                source,
            });
        }
        check_ratio(
            &format!("app {:?} route {:?} ratio", app.name, route.path),
            route.ratio,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_ratio(field: &str, ratio: Option<f64>, errors: &mut Vec<ValidationError>) {
    if let Some(value) = ratio {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::RatioOutOfRange {
                field: field.to_string(),
                value,
            });
        }
    }
}
