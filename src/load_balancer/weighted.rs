//! Smooth weighted round-robin strategy.
//!
//! Every pick adds each backend's weight to its accumulator, chooses the
//! largest accumulator and subtracts the total weight from it. Over one
//! cycle each backend is picked exactly `weight` times, interleaved rather
//! than in bursts.

use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Smooth weighted round-robin selector.
#[derive(Debug)]
pub struct WeightedRoundRobin {
    backends: Vec<Arc<Backend>>,
    current: Mutex<Vec<i64>>,
    total: i64,
}

impl WeightedRoundRobin {
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        let total = backends.iter().map(|b| i64::from(b.weight)).sum();
        let current = Mutex::new(vec![0; backends.len()]);
        Self {
            backends,
            current,
            total,
        }
    }

    /// Accumulator values, in backend order.
    pub fn accumulators(&self) -> Vec<i64> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn select(&self) -> Option<Arc<Backend>> {
        if self.total == 0 {
            return None;
        }

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let mut best: Option<usize> = None;
        for (i, backend) in self.backends.iter().enumerate() {
            current[i] += i64::from(backend.weight);
            // strict '>' keeps the first backend on ties
            if best.map_or(true, |b| current[i] > current[b]) {
                best = Some(i);
            }
        }

        let chosen = best?;
        current[chosen] -= self.total;
        Some(self.backends[chosen].clone())
    }

    fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    fn name(&self) -> &'static str {
        "wrr"
    }
}
