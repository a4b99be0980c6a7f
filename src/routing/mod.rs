//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → router.rs (per-application Router)
//!     → tree.rs (radix walk over path bytes)
//!     → Return: Found(leaf) | TrailingSlashRedirect | NotFound
//!
//! Route Compilation (on config load):
//!     RouteConfig[]
//!     → MethodSet::parse (method.rs)
//!     → Router::register_with (split nodes, attach tracker)
//!     → Freeze as part of an immutable registry snapshot
//! ```
//!
//! # Design Decisions
//! - Routes compiled on load, immutable at runtime
//! - Wildcard conflicts fail compilation, never a request
//! - Lookup allocates nothing
//! - Method checks happen on the matched leaf, not in the walk

pub mod method;
pub mod router;
pub mod tree;

pub use method::{Method, MethodSet};
pub use router::Router;
pub use tree::{Leaf, Match, RouteError, RouteHandle, RoutePolicy};
