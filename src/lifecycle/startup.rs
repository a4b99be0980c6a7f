//! Startup orchestration.
//!
//! # Order
//! 1. Load and validate configuration (fatal on error)
//! 2. Logging, then metrics exporter
//! 3. Build the registry (fatal on route errors)
//! 4. Bind listeners, start the config watcher and signal listener
//! 5. Serve until shutdown

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{logging, metrics};
use crate::resilience::BuildError;

/// Fatal startup failure.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("registry: {0}")]
    Build(#[from] BuildError),

    #[error("bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server: {0}")]
    Io(#[from] std::io::Error),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),
}

/// Run the proxy described by the configuration file at `path`.
pub async fn run(path: &Path) -> Result<(), StartupError> {
    let config = load_config(path)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        apps = config.apps.len(),
        bind_address = %config.listener.bind_address,
        "guard-proxy starting"
    );

    start_metrics(&config);

    let server = HttpServer::new(config.clone())?;
    let listener = bind(&config.listener.bind_address).await?;

    let (watcher, config_updates) = ConfigWatcher::new(path);
    let _watcher = watcher.run()?;

    let shutdown = Shutdown::new();
    if config.admin.enabled {
        let admin_listener = bind(&config.admin.bind_address).await?;
        let admin = setup_admin_router(server.state());
        let stop = shutdown.signalled();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(stop)
                .await
            {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    signals::spawn_signal_listener(shutdown.clone());
    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn start_metrics(config: &ProxyConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to start metrics exporter");
            }
        }
        Err(_) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
