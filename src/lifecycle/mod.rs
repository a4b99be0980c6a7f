//! Process lifecycle.
//!
//! # Flow
//! ```text
//! startup.rs:  load config → logging/metrics → registry → listeners → serve
//! signals.rs:  SIGINT/SIGTERM → Shutdown::trigger
//! shutdown.rs: broadcast to the proxy and admin listeners → drain → exit
//! ```
//!
//! Startup errors end the process. Reload errors are logged and the running
//! snapshot is kept.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
