//! Configuration: one TOML file, validated before anything is built.
//!
//! ```text
//! guard-proxy.toml
//!     → loader.rs      toml → ProxyConfig
//!     → validation.rs  every semantic error, collected
//!     → Breaker::from_config (routers, trackers, balancers)
//!
//! watcher.rs (notify) re-runs the same pipeline on change and hands the
//! result to the server, which swaps the published snapshot.
//! ```
//!
//! Every section and most fields have defaults, so a file with a single
//! `[[apps]]` entry is a complete configuration. A file that fails at any
//! stage leaves the running snapshot untouched.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, AppConfig, BackendConfig, BreakerConfig, ListenerConfig, ObservabilityConfig,
    ProxyConfig, RouteConfig, TimeoutConfig,
};
pub use validation::ValidationError;
