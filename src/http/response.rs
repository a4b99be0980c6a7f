//! Responses the proxy answers on its own.
//!
//! # Responsibilities
//! - Map non-admit decisions to HTTP responses
//! - Build the unknown-host and upstream-failure responses
//!
//! # Design Decisions
//! - Redirects keep the query string
//! - Rejections carry the configured fallback body, empty otherwise

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::resilience::Decision;

/// Response for a decision answered without a backend.
///
/// Returns `None` for [`Decision::Admit`].
pub fn decision_response(decision: &Decision, query: Option<&str>) -> Option<Response> {
    let response = match decision {
        Decision::Redirect { location, status } => {
            let target = match query {
                Some(q) if !q.is_empty() => format!("{}?{}", location, q),
                _ => location.clone(),
            };
            redirect(&target, *status)
        }
        Decision::NotFound => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
        Decision::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Decision::Reject { fallback, .. } => match fallback {
            Some(body) => (StatusCode::TOO_MANY_REQUESTS, body.to_string()).into_response(),
            None => StatusCode::TOO_MANY_REQUESTS.into_response(),
        },
        Decision::Forbidden => StatusCode::FORBIDDEN.into_response(),
        Decision::Admit(_) => return None,
    };
    Some(response)
}

/// 404 for a host without an application.
pub fn unknown_app(host: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("app {} not exist", host)).into_response()
}

/// 502 for a failed or timed out backend call.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
}

fn redirect(location: &str, status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::TEMPORARY_REDIRECT);
    match HeaderValue::from_str(location) {
        Ok(value) => Response::builder()
            .status(status)
            .header(header::LOCATION, value)
            .body(Body::empty())
            .unwrap_or_else(|_| status.into_response()),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}
