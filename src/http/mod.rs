//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, host extraction)
//!     → registry lookup + admission decision (resilience)
//!     → forward.rs (rewrite URI, call backend with deadline)
//!     → response.rs (proxy-generated responses: redirect/404/405/429/403/502)
//!     → Send to client, record status on the route
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
