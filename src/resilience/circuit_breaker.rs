//! Per-request admission gate.
//!
//! # Decision Order
//! ```text
//! match_path(path)
//!     → TrailingSlashRedirect: Redirect (301 GET / 307 other), or 404 if disabled
//!     → NotFound: 404
//!     → method not in leaf mask: 405
//!     → route ratio > threshold: 429 (balancer not consulted)
//!     → balancer empty: 403
//!     → Admit(backend, route handle)
//! ```
//!
//! # Design Decisions
//! - The breaker is per route, not per backend
//! - Ratio is read from the current tracker bucket only
//! - No half-open state: a new bucket starts with a clean ratio
//! - Deciding never awaits and never allocates on the admit path

use std::fmt;
use std::sync::Arc;

use crate::load_balancer::{Backend, LoadBalancer};
use crate::routing::{Match, Method, RouteHandle, Router};

/// One configured application: a router plus a backend selector.
#[derive(Debug)]
pub struct Application {
    name: Arc<str>,
    router: Router,
    balancer: Box<dyn LoadBalancer>,
    redirect_trailing_slash: bool,
    ratio: f64,
    fallback: Option<Arc<str>>,
}

impl Application {
    /// `ratio` is the app-level threshold already resolved against defaults.
    pub fn new(
        name: impl Into<Arc<str>>,
        router: Router,
        balancer: Box<dyn LoadBalancer>,
        ratio: f64,
    ) -> Self {
        Self {
            name: name.into(),
            router,
            balancer,
            redirect_trailing_slash: true,
            ratio,
            fallback: None,
        }
    }

    pub fn with_trailing_slash_redirect(mut self, enabled: bool) -> Self {
        self.redirect_trailing_slash = enabled;
        self
    }

    /// Body for 429 responses of routes without their own fallback.
    pub fn with_fallback(mut self, fallback: Option<Arc<str>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn balancer(&self) -> &dyn LoadBalancer {
        self.balancer.as_ref()
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn redirects_trailing_slash(&self) -> bool {
        self.redirect_trailing_slash
    }

    /// Run the admission protocol for one request.
    pub fn decide(&self, path: &str, method: &str) -> Decision {
        let leaf = match self.router.match_path(path) {
            Match::Found(leaf) => leaf,
            Match::TrailingSlashRedirect if self.redirect_trailing_slash => {
                let status = if method == Method::Get.as_str() { 301 } else { 307 };
                return Decision::Redirect {
                    location: toggle_trailing_slash(path),
                    status,
                };
            }
            Match::TrailingSlashRedirect | Match::NotFound => return Decision::NotFound,
        };

        match Method::from_wire(method) {
            Some(m) if leaf.allows(m) => {}
            _ => return Decision::MethodNotAllowed,
        }

        let policy = leaf.policy();
        let threshold = policy.ratio.unwrap_or(self.ratio);
        let ratio = leaf.tracker().ratio();
        if ratio > threshold {
            return Decision::Reject {
                fallback: policy.fallback.clone().or_else(|| self.fallback.clone()),
                ratio,
            };
        }

        match self.balancer.select() {
            Some(backend) => Decision::Admit(Admission {
                backend,
                route: leaf.handle(),
            }),
            None => Decision::Forbidden,
        }
    }
}

/// Outcome of [`Application::decide`].
#[derive(Debug)]
pub enum Decision {
    /// Path differs from a route by a trailing slash.
    Redirect { location: String, status: u16 },
    NotFound,
    MethodNotAllowed,
    /// Route failure ratio is above its threshold.
    Reject {
        fallback: Option<Arc<str>>,
        ratio: f64,
    },
    /// No backend could be selected.
    Forbidden,
    Admit(Admission),
}

impl Decision {
    /// HTTP status answered without contacting a backend, `None` on admit.
    pub fn status(&self) -> Option<u16> {
        match self {
            Decision::Redirect { status, .. } => Some(*status),
            Decision::NotFound => Some(404),
            Decision::MethodNotAllowed => Some(405),
            Decision::Reject { .. } => Some(429),
            Decision::Forbidden => Some(403),
            Decision::Admit(_) => None,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Redirect { .. } => "redirect",
            Decision::NotFound => "not_found",
            Decision::MethodNotAllowed => "method_not_allowed",
            Decision::Reject { .. } => "reject",
            Decision::Forbidden => "forbidden",
            Decision::Admit(_) => "admit",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An admitted request: where to send it and where to record the result.
#[derive(Debug, Clone)]
pub struct Admission {
    pub backend: Arc<Backend>,
    pub route: RouteHandle,
}

impl Admission {
    /// Record the backend's status (502 for a failed forward).
    pub fn complete(&self, status: u16) -> bool {
        self.route.record(status)
    }
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => format!("{}/", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::LoadBalanceMethod;
    use crate::resilience::timeline::TimelineConfig;
    use crate::routing::{MethodSet, RoutePolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn backends(weights: &[u32]) -> Vec<Backend> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Backend::new(&format!("127.0.0.1:{}", 3000 + i), *w).unwrap())
            .collect()
    }

    fn app_with(routes: &[(&str, &[Method])], weights: &[u32]) -> Application {
        let mut router = Router::new(TimelineConfig::default());
        for (path, methods) in routes {
            router
                .register(path, methods.iter().copied().collect::<MethodSet>())
                .unwrap();
        }
        Application::new(
            "www.example.com",
            router,
            LoadBalanceMethod::Wrr.build(backends(weights)),
            0.3,
        )
    }

    fn admitted(d: Decision) -> Admission {
        match d {
            Decision::Admit(a) => a,
            other => panic!("expected admit, got {:?}", other),
        }
    }

    #[test]
    fn test_user_scenario() {
        let app = app_with(&[("/user/:name", &[Method::Get, Method::Post])], &[5, 1, 1]);

        let first = admitted(app.decide("/user/jhon", "GET"));
        assert_eq!(first.backend.address, "127.0.0.1:3000");
        first.complete(200);

        match app.decide("/user/jhon/", "GET") {
            Decision::Redirect { location, status } => {
                assert_eq!(location, "/user/jhon");
                assert_eq!(status, 301);
            }
            other => panic!("expected redirect, got {:?}", other),
        }
        match app.decide("/user/jhon/", "POST") {
            Decision::Redirect { status, .. } => assert_eq!(status, 307),
            other => panic!("expected redirect, got {:?}", other),
        }

        assert!(matches!(app.decide("/user/jhon", "DELETE"), Decision::MethodNotAllowed));
        assert!(matches!(app.decide("/user/jhon", "get"), Decision::MethodNotAllowed));
        assert!(matches!(app.decide("/nobody", "GET"), Decision::NotFound));
    }

    /// Balancer that counts how often it was asked.
    #[derive(Debug, Default)]
    struct Counting {
        backends: Vec<Arc<Backend>>,
        calls: Arc<AtomicUsize>,
    }

    impl LoadBalancer for Counting {
        fn select(&self) -> Option<Arc<Backend>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.backends.first().cloned()
        }

        fn backends(&self) -> &[Arc<Backend>] {
            &self.backends
        }
    }

    #[test]
    fn test_breaker_opens_without_consulting_balancer() {
        let mut router = Router::default();
        router.register("/pay", Method::Post.into()).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let balancer = Counting {
            backends: backends(&[1]).into_iter().map(Arc::new).collect(),
            calls: calls.clone(),
        };
        let app = Application::new("svc", router, Box::new(balancer), 0.3);

        let Match::Found(leaf) = app.router().match_path("/pay") else {
            panic!("route missing");
        };
        let handle = leaf.handle();
        for _ in 0..100 {
            handle.record(502);
        }

        match app.decide("/pay", "POST") {
            Decision::Reject { ratio, fallback } => {
                assert!(ratio > 0.3);
                assert!(fallback.is_none());
            }
            other => panic!("expected reject, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_route_threshold_overrides_app() {
        let mut router = Router::default();
        router
            .register_with(
                "/strict",
                Method::Get.into(),
                RoutePolicy {
                    ratio: Some(0.0),
                    fallback: Some("try later".into()),
                },
            )
            .unwrap();
        router.register("/lenient", Method::Get.into()).unwrap();
        let app = Application::new(
            "svc",
            router,
            LoadBalanceMethod::Rr.build(backends(&[1])),
            1.0,
        )
        .with_fallback(Some("app default".into()));

        admitted(app.decide("/strict", "GET")).complete(500);
        admitted(app.decide("/lenient", "GET")).complete(500);

        match app.decide("/strict", "GET") {
            Decision::Reject { fallback, .. } => assert_eq!(fallback.as_deref(), Some("try later")),
            other => panic!("expected reject, got {:?}", other),
        }
        assert!(matches!(app.decide("/lenient", "GET"), Decision::Admit(_)));
    }

    #[test]
    fn test_app_fallback_used_when_route_has_none() {
        let mut router = Router::default();
        router.register("/x", Method::Get.into()).unwrap();
        let app = Application::new("svc", router, LoadBalanceMethod::Rr.build(backends(&[1])), 0.0)
            .with_fallback(Some("busy".into()));

        admitted(app.decide("/x", "GET")).complete(429);
        match app.decide("/x", "GET") {
            Decision::Reject { fallback, .. } => assert_eq!(fallback.as_deref(), Some("busy")),
            other => panic!("expected reject, got {:?}", other),
        }
    }

    #[test]
    fn test_forbidden_when_no_backend() {
        let app = app_with(&[("/", &[Method::Get])], &[0, 0]);
        assert!(matches!(app.decide("/", "GET"), Decision::Forbidden));

        let app = app_with(&[("/", &[Method::Get])], &[]);
        assert!(matches!(app.decide("/", "GET"), Decision::Forbidden));
    }

    #[test]
    fn test_redirect_disabled() {
        let app = app_with(&[("/user", &[Method::Get])], &[1]).with_trailing_slash_redirect(false);
        assert!(matches!(app.decide("/user/", "GET"), Decision::NotFound));
    }

    #[test]
    fn test_toggle_trailing_slash() {
        assert_eq!(toggle_trailing_slash("/user/"), "/user");
        assert_eq!(toggle_trailing_slash("/user"), "/user/");
    }

    #[test]
    fn test_decision_status() {
        assert_eq!(Decision::NotFound.status(), Some(404));
        assert_eq!(Decision::Forbidden.status(), Some(403));
        assert_eq!(Decision::MethodNotAllowed.to_string(), "method_not_allowed");
    }
}
