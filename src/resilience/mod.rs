//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request (host, path, method):
//!     → registry.rs (Host → Application)
//!     → circuit_breaker.rs (route match, ratio check, backend pick)
//!     → forward to backend
//!     → timeline.rs (record status into the route's current bucket)
//! ```
//!
//! # Design Decisions
//! - Failure ratio is tracked per route, in fixed time buckets
//! - Rejections never reach a backend
//! - No retries: one backend per admitted request
//! - Registry snapshots are immutable and swapped atomically

pub mod circuit_breaker;
pub mod registry;
pub mod timeline;

pub use circuit_breaker::{Admission, Application, Decision};
pub use registry::{BuildError, Breaker};
pub use timeline::{OutcomeSnapshot, OutcomeTracker, StatusClass, TimelineConfig};
