//! Route registration and lookup for one application.
//!
//! # Responsibilities
//! - Register route patterns with their methods and admission policy
//! - Look up the leaf for a request path
//! - List registered routes for the admin API
//!
//! # Design Decisions
//! - Built once per configuration snapshot, read-only afterwards
//! - The router never rejects on method; callers check the leaf's mask

use crate::resilience::timeline::TimelineConfig;
use crate::routing::method::MethodSet;
use crate::routing::tree::{Leaf, Match, NewRoute, Node, RouteError, RoutePolicy};

/// Radix-tree router.
#[derive(Debug, Default)]
pub struct Router {
    root: Node,
    timeline: TimelineConfig,
}

impl Router {
    /// Create an empty router whose leaves track outcomes with `timeline`.
    pub fn new(timeline: TimelineConfig) -> Self {
        Self {
            root: Node::default(),
            timeline,
        }
    }

    /// Register `path` for `methods` with the default policy.
    pub fn register(&mut self, path: &str, methods: MethodSet) -> Result<(), RouteError> {
        self.register_with(path, methods, RoutePolicy::default())
    }

    /// Register `path` for `methods`.
    ///
    /// Registering an existing path again adds the new methods to the leaf
    /// and replaces its policy; the tracker is kept.
    pub fn register_with(
        &mut self,
        path: &str,
        methods: MethodSet,
        policy: RoutePolicy,
    ) -> Result<(), RouteError> {
        if methods.is_empty() {
            return Err(RouteError::NoMethods(path.to_string()));
        }
        self.root.add_route(&NewRoute {
            pattern: path,
            methods,
            policy,
            timeline: self.timeline,
        })?;

        tracing::debug!(path = %path, methods = %methods, "Route registered");
        Ok(())
    }

    pub fn match_path(&self, path: &str) -> Match<'_> {
        self.root.lookup(path.as_bytes())
    }

    /// Registered leaves, depth first.
    pub fn routes(&self) -> Vec<&Leaf> {
        self.root.leaves()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}
