//! Utilization efficiency scoring
//!
//! For a resource, `idle = (avg_requested - avg_used) / avg_allocation` and
//! `efficiency = 1 - idle`. A zero allocation scores exactly 1.0, which is a
//! red flag rather than a real 100%. Scores above 1 and below 0 are possible
//! and are reported unclamped.

use crate::models::Vector;
use crate::vector::average_vectors;

/// Efficiency scores of one bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Efficiency {
    pub cpu: f64,
    pub ram: f64,
    pub overall: f64,
}

impl Efficiency {
    /// Returns true if any score falls outside `[0, 1]`
    pub fn is_anomalous(&self) -> bool {
        [self.cpu, self.ram, self.overall]
            .iter()
            .any(|e| !(0.0..=1.0).contains(e))
    }
}

/// Idle fraction of one resource, or 0 when nothing was allocated
pub fn idle_fraction(allocation: &[Vector], requested: &[Vector], used: &[Vector]) -> f64 {
    let avg_allocation = average_vectors(allocation);
    if avg_allocation > 0.0 {
        (average_vectors(requested) - average_vectors(used)) / avg_allocation
    } else {
        0.0
    }
}

/// Score CPU, RAM and their cost-weighted blend
pub fn compute(cpu_idle: f64, ram_idle: f64, cpu_cost: f64, ram_cost: f64) -> Efficiency {
    let combined_cost = cpu_cost + ram_cost;
    let overall = if combined_cost > 0.0 {
        1.0 - (cpu_cost * cpu_idle + ram_cost * ram_idle) / combined_cost
    } else {
        1.0
    };

    Efficiency {
        cpu: 1.0 - cpu_idle,
        ram: 1.0 - ram_idle,
        overall,
    }
}
