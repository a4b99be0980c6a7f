//! Admin API.
//!
//! # Endpoints
//! - `GET /admin/status`: version and application count
//! - `GET /admin/apps`: applications with backends, routes and live counters
//! - `POST /admin/apps`: insert or replace one application (JSON `AppConfig`)
//!
//! All endpoints require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::get,
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/apps", get(get_apps).post(upsert_app))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
