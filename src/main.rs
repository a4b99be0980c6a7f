//! guard-proxy
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ registry (Host) ──▶ application
//!                                                            │
//!                                     route tree ◀───────────┤
//!                                     outcome tracker ◀──────┤ admission
//!                                     load balancer ◀────────┘
//!                                                            │
//!     Client Response                                        ▼
//!     ◀────────────── record status ◀── forwarder ◀──── backend
//!
//!     Cross-cutting: config (+ watcher), admin API, observability,
//!     lifecycle (startup, signals, shutdown)
//! ```

use std::path::PathBuf;

use clap::Parser;

use guard_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "guard-proxy")]
#[command(version, about = "Reverse proxy with per-route circuit breaking", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "guard-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    startup::run(&cli.config).await?;
    Ok(())
}
