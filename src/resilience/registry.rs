//! Host → application registry.
//!
//! # Responsibilities
//! - Build every application (router, trackers, balancer) from a config
//! - Resolve the request `Host` to an application
//!
//! # Design Decisions
//! - Built in one pass; any route error fails the whole build
//! - Immutable once built; reconfiguration publishes a new registry
//! - Host lookup is case-insensitive and falls back to the host without port

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{AppConfig, BreakerConfig, ProxyConfig};
use crate::load_balancer::{Backend, InvalidBackend};
use crate::resilience::circuit_breaker::Application;
use crate::routing::method::{MethodSet, UnknownMethod};
use crate::routing::tree::{RouteError, RoutePolicy};
use crate::routing::Router;

/// Error building the registry, tagged with the offending application.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("app {app:?}: {source}")]
    Route { app: String, source: RouteError },

    #[error("app {app:?}: route {path:?}: {source}")]
    Method {
        app: String,
        path: String,
        source: UnknownMethod,
    },

    #[error("app {app:?}: {source}")]
    Backend { app: String, source: InvalidBackend },
}

/// Immutable set of applications keyed by lowercase host name.
#[derive(Debug, Default)]
pub struct Breaker {
    apps: HashMap<String, Arc<Application>>,
}

impl Breaker {
    /// Build all applications of `config`.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, BuildError> {
        let mut apps = HashMap::with_capacity(config.apps.len());
        for app in &config.apps {
            let built = build_app(app, &config.breaker)?;
            apps.insert(app.name.to_ascii_lowercase(), Arc::new(built));
        }

        tracing::info!(apps = apps.len(), "Breaker registry built");
        Ok(Self { apps })
    }

    /// Application serving `host` (a `Host` header value).
    pub fn lookup(&self, host: &str) -> Option<&Arc<Application>> {
        let host = host.trim().to_ascii_lowercase();
        if let Some(app) = self.apps.get(&host) {
            return Some(app);
        }
        strip_port(&host).and_then(|bare| self.apps.get(bare))
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Applications sorted by name.
    pub fn apps(&self) -> Vec<&Arc<Application>> {
        let mut apps: Vec<_> = self.apps.values().collect();
        apps.sort_by(|a, b| a.name().cmp(b.name()));
        apps
    }
}

fn build_app(app: &AppConfig, breaker: &BreakerConfig) -> Result<Application, BuildError> {
    let mut router = Router::new(breaker.timeline());
    for route in &app.routes {
        let methods = MethodSet::parse(&route.methods).map_err(|source| BuildError::Method {
            app: app.name.clone(),
            path: route.path.clone(),
            source,
        })?;
        let policy = RoutePolicy {
            ratio: route.ratio,
            fallback: route.fallback.as_deref().map(Arc::from),
        };
        router
            .register_with(&route.path, methods, policy)
            .map_err(|source| BuildError::Route {
                app: app.name.clone(),
                source,
            })?;
    }

    let backends = app
        .backends
        .iter()
        .map(|b| Backend::new(&b.address, b.weight))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| BuildError::Backend {
            app: app.name.clone(),
            source,
        })?;

    let balancer = app.load_balance_method.build(backends);
    tracing::debug!(
        app = %app.name,
        routes = app.routes.len(),
        backends = balancer.backends().len(),
        balancer = balancer.name(),
        "Application built"
    );

    Ok(
        Application::new(
            app.name.as_str(),
            router,
            balancer,
            app.ratio.unwrap_or(breaker.default_ratio),
        )
        .with_trailing_slash_redirect(!app.disable_tsr)
        .with_fallback(app.fallback.as_deref().map(Arc::from)),
    )
}

/// `example.com:8080` → `example.com`, `[::1]:80` → `[::1]`.
fn strip_port(host: &str) -> Option<&str> {
    let (bare, port) = host.rsplit_once(':')?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if bare.contains(':') && !bare.ends_with(']') {
        return None;
    }
    Some(bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BackendConfig, RouteConfig};
    use crate::load_balancer::LoadBalanceMethod;
    use crate::resilience::circuit_breaker::Decision;

    fn config() -> ProxyConfig {
        ProxyConfig {
            apps: vec![AppConfig {
                name: "WWW.Example.com".into(),
                load_balance_method: LoadBalanceMethod::Wrr,
                ratio: Some(0.5),
                disable_tsr: true,
                fallback: Some("busy".into()),
                backends: vec![BackendConfig {
                    address: "127.0.0.1:3000".into(),
                    weight: 2,
                }],
                routes: vec![RouteConfig {
                    path: "/user/:name".into(),
                    methods: vec!["get".into(), "POST".into()],
                    ratio: None,
                    fallback: None,
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let breaker = Breaker::from_config(&config()).unwrap();
        assert_eq!(breaker.len(), 1);

        let app = breaker.lookup("www.example.com").unwrap();
        assert_eq!(app.ratio(), 0.5);
        assert!(!app.redirects_trailing_slash());
        assert_eq!(app.balancer().name(), "wrr");

        assert!(breaker.lookup("WWW.EXAMPLE.COM:8080").is_some());
        assert!(breaker.lookup("other.example.com").is_none());
        assert!(matches!(app.decide("/user/jhon", "POST"), Decision::Admit(_)));
        assert!(matches!(app.decide("/user/jhon/", "GET"), Decision::NotFound));
    }

    #[test]
    fn test_default_ratio_applies() {
        let mut cfg = config();
        cfg.apps[0].ratio = None;
        cfg.breaker.default_ratio = 0.2;
        let breaker = Breaker::from_config(&cfg).unwrap();
        assert_eq!(breaker.lookup("www.example.com").unwrap().ratio(), 0.2);
    }

    #[test]
    fn test_route_error_fails_build() {
        let mut cfg = config();
        cfg.apps[0].routes.push(RouteConfig {
            path: "/user/:id".into(),
            methods: vec!["GET".into()],
            ratio: None,
            fallback: None,
        });

        let err = Breaker::from_config(&cfg).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Route {
                source: RouteError::WildcardConflict { .. },
                ..
            }
        ));
        assert!(err.to_string().starts_with("app \"WWW.Example.com\""));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), Some("example.com"));
        assert_eq!(strip_port("[::1]:80"), Some("[::1]"));
        assert_eq!(strip_port("example.com"), None);
        assert_eq!(strip_port("::1"), None);
    }
}
