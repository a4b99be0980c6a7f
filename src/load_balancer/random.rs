//! Uniform random load balancing strategy.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Random selector. Keeps no state between picks.
#[derive(Debug, Default)]
pub struct Random {
    backends: Vec<Arc<Backend>>,
}

impl Random {
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        Self { backends }
    }
}

impl LoadBalancer for Random {
    fn select(&self) -> Option<Arc<Backend>> {
        match self.backends.len() {
            0 => None,
            1 => Some(self.backends[0].clone()),
            len => {
                let index = rand::thread_rng().gen_range(0..len);
                Some(self.backends[index].clone())
            }
        }
    }

    fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
