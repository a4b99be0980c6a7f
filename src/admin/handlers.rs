use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::config::validation::validate_app;
use crate::config::AppConfig;
use crate::http::server::AppState;
use crate::resilience::{Application, OutcomeSnapshot};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub apps: usize,
}

#[derive(Serialize)]
pub struct AppStatus {
    pub name: String,
    pub load_balancer: &'static str,
    pub ratio: f64,
    pub redirect_trailing_slash: bool,
    pub backends: Vec<BackendStatus>,
    pub routes: Vec<RouteStatus>,
}

#[derive(Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub weight: u32,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub path: String,
    pub methods: Vec<&'static str>,
    /// Route-level threshold, if set.
    pub threshold: Option<f64>,
    /// Counters of the current bucket.
    pub outcomes: OutcomeSnapshot,
    pub failure_ratio: f64,
}

#[derive(Serialize)]
pub struct UpsertResult {
    pub status: &'static str,
    pub app: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: Vec<String>,
}

impl From<&Application> for AppStatus {
    fn from(app: &Application) -> Self {
        let backends = app
            .balancer()
            .backends()
            .iter()
            .map(|b| BackendStatus {
                address: b.address.clone(),
                weight: b.weight,
            })
            .collect();

        let routes = app
            .router()
            .routes()
            .into_iter()
            .map(|leaf| {
                let outcomes = leaf.tracker().snapshot();
                RouteStatus {
                    path: leaf.pattern().to_string(),
                    methods: leaf.methods().iter().map(|m| m.as_str()).collect(),
                    threshold: leaf.policy().ratio,
                    failure_ratio: outcomes.ratio(),
                    outcomes,
                }
            })
            .collect();

        Self {
            name: app.name().to_string(),
            load_balancer: app.balancer().name(),
            ratio: app.ratio(),
            redirect_trailing_slash: app.redirects_trailing_slash(),
            backends,
            routes,
        }
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        apps: state.inner.load().breaker.len(),
    })
}

pub async fn get_apps(State(state): State<AppState>) -> Json<Vec<AppStatus>> {
    let inner = state.inner.load_full();
    Json(
        inner
            .breaker
            .apps()
            .into_iter()
            .map(|app| AppStatus::from(app.as_ref()))
            .collect(),
    )
}

/// Insert or replace one application and publish the result.
pub async fn upsert_app(
    State(state): State<AppState>,
    Json(app): Json<AppConfig>,
) -> Result<Json<UpsertResult>, (StatusCode, Json<ErrorBody>)> {
    if let Err(errors) = validate_app(&app) {
        return Err(bad_request(errors.iter().map(ToString::to_string).collect()));
    }

    let name = app.name.clone();
    state
        .modify(|config| config.upsert_app(app))
        .map_err(|e| bad_request(vec![e.to_string()]))?;

    tracing::info!(app = %name, "Application updated via admin API");
    Ok(Json(UpsertResult {
        status: "success",
        app: name,
    }))
}

fn bad_request(errors: Vec<String>) -> (StatusCode, Json<ErrorBody>) {
    tracing::warn!(errors = ?errors, "Rejected application update");
    (StatusCode::BAD_REQUEST, Json(ErrorBody { errors }))
}
