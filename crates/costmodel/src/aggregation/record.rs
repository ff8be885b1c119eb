//! Aggregation record for one bucket

use super::efficiency::{self, Efficiency};
use super::GroupField;
use crate::models::{CostData, Vector};
use crate::pricing::PriceVectors;
use crate::vector::{add_vectors, total_vectors};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Accumulated cost report for one grouping key
///
/// Raw usage vectors are kept only for efficiency scoring and never
/// serialized. Cost vectors are serialized when non-empty, which after
/// finalization means only when time series output was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub aggregation: GroupField,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<String>,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    pub cpu_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpu_cost_vector: Vec<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_efficiency: Option<f64>,

    pub ram_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ram_cost_vector: Vec<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_efficiency: Option<f64>,

    pub gpu_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpu_cost_vector: Vec<Vector>,

    pub pv_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pv_cost_vector: Vec<Vector>,

    pub network_cost: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_cost_vector: Vec<Vector>,

    pub shared_cost: f64,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<f64>,

    #[serde(skip)]
    pub cpu_allocation_vectors: Vec<Vector>,
    #[serde(skip)]
    pub cpu_requested_vectors: Vec<Vector>,
    #[serde(skip)]
    pub cpu_used_vectors: Vec<Vector>,
    #[serde(skip)]
    pub ram_allocation_vectors: Vec<Vector>,
    #[serde(skip)]
    pub ram_requested_vectors: Vec<Vector>,
    #[serde(skip)]
    pub ram_used_vectors: Vec<Vector>,
    #[serde(skip)]
    pub gpu_allocation_vectors: Vec<Vector>,
    #[serde(skip)]
    clusters: BTreeSet<String>,
}

impl Aggregation {
    pub fn new(aggregation: GroupField, subfields: &[String], environment: impl Into<String>) -> Self {
        Self {
            aggregation,
            subfields: subfields.to_vec(),
            environment: environment.into(),
            cluster: None,
            cpu_cost: 0.0,
            cpu_cost_vector: Vec::new(),
            cpu_efficiency: None,
            ram_cost: 0.0,
            ram_cost_vector: Vec::new(),
            ram_efficiency: None,
            gpu_cost: 0.0,
            gpu_cost_vector: Vec::new(),
            pv_cost: 0.0,
            pv_cost_vector: Vec::new(),
            network_cost: 0.0,
            network_cost_vector: Vec::new(),
            shared_cost: 0.0,
            total_cost: 0.0,
            efficiency: None,
            cpu_allocation_vectors: Vec::new(),
            cpu_requested_vectors: Vec::new(),
            cpu_used_vectors: Vec::new(),
            ram_allocation_vectors: Vec::new(),
            ram_requested_vectors: Vec::new(),
            ram_used_vectors: Vec::new(),
            gpu_allocation_vectors: Vec::new(),
            clusters: BTreeSet::new(),
        }
    }

    /// Merge a workload's raw usage and its priced cost vectors into this bucket
    pub fn merge(&mut self, datum: &CostData, prices: &PriceVectors) {
        merge_into(&mut self.cpu_allocation_vectors, &datum.cpu_allocation);
        merge_into(&mut self.cpu_requested_vectors, &datum.cpu_requested);
        merge_into(&mut self.cpu_used_vectors, &datum.cpu_used);

        merge_into(&mut self.ram_allocation_vectors, &datum.ram_allocation);
        merge_into(&mut self.ram_requested_vectors, &datum.ram_requested);
        merge_into(&mut self.ram_used_vectors, &datum.ram_used);

        merge_into(&mut self.gpu_allocation_vectors, &datum.gpu_requested);

        merge_into(&mut self.cpu_cost_vector, &prices.cpu);
        merge_into(&mut self.ram_cost_vector, &prices.ram);
        merge_into(&mut self.gpu_cost_vector, &prices.gpu);
        merge_into(&mut self.network_cost_vector, &prices.network);
        for pv in &prices.pvs {
            merge_into(&mut self.pv_cost_vector, pv);
        }

        if !datum.cluster_id.is_empty() {
            self.clusters.insert(datum.cluster_id.clone());
        }
    }

    /// Length of the longest cost vector
    pub fn data_length(&self) -> usize {
        [
            &self.cpu_cost_vector,
            &self.ram_cost_vector,
            &self.pv_cost_vector,
            &self.gpu_cost_vector,
            &self.network_cost_vector,
        ]
        .iter()
        .map(|v| v.len())
        .max()
        .unwrap_or(0)
    }

    /// Sum cost vectors to scalars and add this bucket's share of pooled cost
    pub(super) fn total_costs(&mut self, shared_cost: f64) {
        self.cpu_cost = total_vectors(&self.cpu_cost_vector);
        self.ram_cost = total_vectors(&self.ram_cost_vector);
        self.gpu_cost = total_vectors(&self.gpu_cost_vector);
        self.pv_cost = total_vectors(&self.pv_cost_vector);
        self.network_cost = total_vectors(&self.network_cost_vector);
        self.shared_cost = shared_cost;

        self.cluster = match self.clusters.len() {
            1 => self.clusters.iter().next().cloned(),
            _ => None,
        };
    }

    /// Convert cumulative cost scalars into a per-period rate
    pub(super) fn normalize(&mut self, data_length: usize) {
        if data_length == 0 {
            return;
        }
        let n = data_length as f64;
        self.cpu_cost /= n;
        self.ram_cost /= n;
        self.gpu_cost /= n;
        self.pv_cost /= n;
        self.network_cost /= n;
        self.shared_cost /= n;
    }

    pub(super) fn sum_total_cost(&mut self) {
        self.total_cost = self.cpu_cost
            + self.ram_cost
            + self.gpu_cost
            + self.pv_cost
            + self.network_cost
            + self.shared_cost;
    }

    /// Score efficiency from the retained usage vectors
    pub(super) fn score_efficiency(&mut self) -> Efficiency {
        let cpu_idle = efficiency::idle_fraction(
            &self.cpu_allocation_vectors,
            &self.cpu_requested_vectors,
            &self.cpu_used_vectors,
        );
        let ram_idle = efficiency::idle_fraction(
            &self.ram_allocation_vectors,
            &self.ram_requested_vectors,
            &self.ram_used_vectors,
        );

        let scores = efficiency::compute(cpu_idle, ram_idle, self.cpu_cost, self.ram_cost);
        self.cpu_efficiency = Some(scores.cpu);
        self.ram_efficiency = Some(scores.ram);
        self.efficiency = Some(scores.overall);
        scores
    }

    /// Drop retained vectors that are not part of the requested output
    pub(super) fn discard_time_series(&mut self) {
        self.cpu_cost_vector = Vec::new();
        self.ram_cost_vector = Vec::new();
        self.gpu_cost_vector = Vec::new();
        self.pv_cost_vector = Vec::new();
        self.network_cost_vector = Vec::new();

        self.cpu_allocation_vectors = Vec::new();
        self.cpu_requested_vectors = Vec::new();
        self.cpu_used_vectors = Vec::new();
        self.ram_allocation_vectors = Vec::new();
        self.ram_requested_vectors = Vec::new();
        self.ram_used_vectors = Vec::new();
        self.gpu_allocation_vectors = Vec::new();
    }

    /// Returns true if any efficiency score falls outside `[0, 1]`
    pub fn has_efficiency_anomaly(&self) -> bool {
        [self.cpu_efficiency, self.ram_efficiency, self.efficiency]
            .iter()
            .flatten()
            .any(|e| !(0.0..=1.0).contains(e))
    }
}

fn merge_into(acc: &mut Vec<Vector>, series: &[Vector]) {
    *acc = add_vectors(series, acc);
}
