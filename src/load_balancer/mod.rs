//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted by the breaker
//!     → Application's balancer (one per application)
//!     → Apply load balancing algorithm:
//!         - weighted.rs (smooth weighted round robin)
//!         - round_robin.rs (rotate through backends)
//!         - random.rs (uniform pick)
//!     → Return Arc<Backend> or None (empty pool / all weights zero)
//! ```
//!
//! # Design Decisions
//! - Each balancer owns its backend list, built once per config snapshot
//! - Algorithm selection per application
//! - Only the weighted balancer takes a lock; the others are lock-free

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod backend;
pub mod random;
pub mod round_robin;
pub mod weighted;

pub use backend::{Backend, InvalidBackend};
pub use random::Random;
pub use round_robin::RoundRobin;
pub use weighted::WeightedRoundRobin;

/// Backend selection strategy.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick the backend for the next request.
    fn select(&self) -> Option<Arc<Backend>>;

    /// The backends this balancer chooses from.
    fn backends(&self) -> &[Arc<Backend>];

    /// Short algorithm name, as used in configuration.
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Algorithm names accepted in `load_balance_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadBalanceMethod {
    /// Smooth weighted round robin.
    Wrr,
    #[default]
    Rr,
    Random,
}

impl LoadBalanceMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalanceMethod::Wrr => "wrr",
            LoadBalanceMethod::Rr => "rr",
            LoadBalanceMethod::Random => "random",
        }
    }

    /// Build a balancer of this kind over `backends`.
    pub fn build(self, backends: Vec<Backend>) -> Box<dyn LoadBalancer> {
        let backends: Vec<Arc<Backend>> = backends.into_iter().map(Arc::new).collect();
        match self {
            LoadBalanceMethod::Wrr => Box::new(WeightedRoundRobin::new(backends)),
            LoadBalanceMethod::Rr => Box::new(RoundRobin::new(backends)),
            LoadBalanceMethod::Random => Box::new(Random::new(backends)),
        }
    }
}

impl fmt::Display for LoadBalanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
