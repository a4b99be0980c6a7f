//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server and its selection weight
//! - Pre-parse the base URL the forwarder rewrites requests against

use std::fmt;

use thiserror::Error;
use url::Url;

/// Error returned for an address that cannot be turned into a base URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid backend address {address:?}: {reason}")]
pub struct InvalidBackend {
    pub address: String,
    pub reason: String,
}

/// A single backend server. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// `host:port` as configured (scheme stripped).
    pub address: String,
    /// Relative share for weighted selection.
    pub weight: u32,
    /// Pre-calculated base URL for request rewriting.
    pub base_url: Url,
}

impl Backend {
    /// Build a backend from `host:port` or an `http://` URL.
    pub fn new(address: &str, weight: u32) -> Result<Self, InvalidBackend> {
        let invalid = |reason: &str| InvalidBackend {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty address"));
        }

        let raw = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };
        let base_url = Url::parse(&raw).map_err(|e| invalid(&e.to_string()))?;

        if base_url.scheme() != "http" {
            return Err(invalid("only http backends are supported"));
        }
        let host = base_url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match base_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            address: authority,
            weight,
            base_url,
        })
    }

    /// `scheme://host:port` without a trailing slash.
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
