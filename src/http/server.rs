//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Dispatch requests by `Host` to an application
//! - Drive the admission protocol and forward admitted requests
//! - Apply configuration updates by publishing a new snapshot

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response;
use crate::observability::metrics;
use crate::resilience::{BuildError, Breaker, Decision};

/// One published configuration and everything built from it.
#[derive(Debug)]
pub struct Inner {
    pub config: ProxyConfig,
    pub breaker: Breaker,
    pub forwarder: Forwarder,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<Inner>>,
    writer: Arc<Mutex<()>>,
}

impl AppState {
    /// Build the first snapshot.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        let breaker = Breaker::from_config(&config)?;
        let forwarder = Forwarder::new(Duration::from_secs(config.timeouts.upstream_secs));
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(Inner {
                config,
                breaker,
                forwarder,
            })),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Build a snapshot from `config` and publish it.
    ///
    /// On error the current snapshot stays live.
    pub fn publish(&self, config: ProxyConfig) -> Result<(), BuildError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.store(config)
    }

    /// Edit a copy of the live configuration and publish it.
    pub fn modify<F>(&self, edit: F) -> Result<(), BuildError>
    where
        F: FnOnce(&mut ProxyConfig),
    {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = self.inner.load().config.clone();
        edit(&mut config);
        self.store(config)
    }

    fn store(&self, config: ProxyConfig) -> Result<(), BuildError> {
        let breaker = Breaker::from_config(&config)?;
        let forwarder = self
            .inner
            .load()
            .forwarder
            .with_timeout(Duration::from_secs(config.timeouts.upstream_secs));
        self.inner.store(Arc::new(Inner {
            config,
            breaker,
            forwarder,
        }));
        Ok(())
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, BuildError> {
        let state = AppState::new(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Shared state, for the admin API.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let request_secs = state.inner.load().config.timeouts.request_secs;
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, applying `config_updates` as
    /// they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let apps = config.apps.len();
                match state.publish(config) {
                    Ok(()) => {
                        metrics::record_config_reload(true);
                        tracing::info!(apps, "Configuration reloaded");
                    }
                    Err(e) => {
                        metrics::record_config_reload(false);
                        tracing::error!(error = %e, "Rejected new configuration, keeping current");
                    }
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the application, runs admission, and forwards if admitted.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let host = request.target_host().unwrap_or_default().to_string();

    let inner = state.inner.load_full();
    let Some(app) = inner.breaker.lookup(&host).cloned() else {
        tracing::warn!(request_id = %request_id, host = %host, "No application for host");
        return response::unknown_app(&host);
    };
    let forwarder = inner.forwarder.clone();
    drop(inner);

    let path = request.uri().path().to_string();
    let decision = app.decide(&path, request.method().as_str());
    metrics::record_decision(app.name(), decision.label());

    let admission = match decision {
        Decision::Admit(admission) => admission,
        other => {
            tracing::debug!(
                request_id = %request_id,
                app = %app.name(),
                method = %request.method(),
                path = %path,
                decision = %other,
                "Request answered by proxy"
            );
            if let Decision::Reject { ratio, .. } = &other {
                tracing::warn!(request_id = %request_id, app = %app.name(), path = %path, ratio, "Circuit open, rejecting");
            }
            return response::decision_response(&other, request.uri().query())
                .unwrap_or_else(response::bad_gateway);
        }
    };

    tracing::debug!(
        request_id = %request_id,
        app = %app.name(),
        route = %admission.route.pattern(),
        backend = %admission.backend,
        "Forwarding request"
    );

    let response = match forwarder
        .forward(&admission.backend, request, Some(client))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %admission.backend,
                error = %e,
                "Upstream error"
            );
            response::bad_gateway()
        }
    };

    let status = response.status().as_u16();
    admission.complete(status);
    metrics::record_request(app.name(), status, start);
    response
}
