//! Backend forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the selected backend
//! - Strip hop-by-hop headers both ways, add `x-forwarded-for`
//! - Enforce the upstream deadline
//!
//! # Design Decisions
//! - One pooled hyper-util client shared by all applications
//! - Bodies are streamed, never buffered
//! - A transport error or timeout is an error value; the caller answers 502

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        uri::{Authority, InvalidUri, InvalidUriParts, PathAndQuery, Scheme},
        Request, Uri, Version,
    },
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::http::request::{append_forwarded_for, strip_hop_by_hop};
use crate::load_balancer::Backend;

/// Why a request could not be forwarded.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid backend authority: {0}")]
    Authority(#[from] InvalidUri),

    #[error("invalid upstream uri: {0}")]
    Uri(#[from] InvalidUriParts),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),
}

/// Sends admitted requests to their backend.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    /// Same connection pool, different deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward `request` to `backend` and return its response.
    pub async fn forward(
        &self,
        backend: &Backend,
        request: Request<Body>,
        client: Option<SocketAddr>,
    ) -> Result<Response, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = std::mem::take(&mut parts.uri).into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(Authority::from_str(&backend.address)?);
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = Uri::from_parts(uri_parts)?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if let Some(addr) = client {
            append_forwarded_for(&mut parts.headers, addr.ip());
        }

        let upstream = Request::from_parts(parts, body);
        let response = tokio::time::timeout(self.timeout, self.client.request(upstream))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))??;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("timeout", &self.timeout)
            .finish()
    }
}
