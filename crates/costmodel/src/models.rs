//! Core data models for the cost model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One observation of usage or cost at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub timestamp: f64,
    pub value: f64,
}

impl Vector {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Pricing attributes of the node a workload was scheduled on
///
/// Prices are kept as the strings reported by the pricing source and are
/// only parsed when cost vectors are computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeData {
    pub instance_type: String,
    /// Purchase tier, e.g. "ondemand", "spot" or "preemptible"
    pub usage_type: String,
    /// Hourly price per vCPU
    pub vcpu_cost: String,
    /// Hourly price per GiB of memory
    pub ram_cost: String,
    /// Hourly price per GPU
    pub gpu_cost: String,
    /// Hourly price per GiB of attached storage
    pub storage_cost: String,
}

impl NodeData {
    /// Returns true if the node is billed on a spot/preemptible tier
    pub fn is_spot(&self) -> bool {
        let usage = self.usage_type.to_ascii_lowercase();
        usage.contains("spot") || usage.contains("preemptible")
    }
}

/// Persistent volume bound to a claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistentVolume {
    pub name: String,
    pub storage_class: String,
    /// Hourly price per GiB
    pub cost: String,
}

/// Usage of one persistent volume claim attached to a workload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PvcData {
    pub claim_name: String,
    pub namespace: String,
    /// Volume backing the claim; unbound claims carry no cost
    pub volume: Option<PersistentVolume>,
    /// Requested bytes over time
    pub values: Vec<Vector>,
}

/// Raw usage for a single workload, as produced by the collection backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CostData {
    pub name: String,
    pub pod_name: String,
    pub node_name: String,
    pub namespace: String,
    pub cluster_id: String,
    pub node_data: NodeData,
    pub services: Vec<String>,
    pub deployments: Vec<String>,
    pub daemonsets: Vec<String>,
    pub labels: HashMap<String, String>,
    /// Cores
    pub cpu_allocation: Vec<Vector>,
    pub cpu_requested: Vec<Vector>,
    pub cpu_used: Vec<Vector>,
    /// Bytes
    pub ram_allocation: Vec<Vector>,
    pub ram_requested: Vec<Vector>,
    pub ram_used: Vec<Vector>,
    pub gpu_requested: Vec<Vector>,
    pub pvc_data: Vec<PvcData>,
    /// Already expressed in cost units
    pub network_cost: Vec<Vector>,
}

/// One `[timestamp, value]` pair of a billing query result
pub type BillingSample = [String; 2];

/// Actual billed cost of a cluster over a lookback window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterCostTotals {
    pub cpu_cost: Vec<BillingSample>,
    pub mem_cost: Vec<BillingSample>,
    pub storage_cost: Vec<BillingSample>,
}

impl ClusterCostTotals {
    /// Returns true if every resource reported at least one sample
    pub fn has_data(&self) -> bool {
        !self.cpu_cost.is_empty() && !self.mem_cost.is_empty() && !self.storage_cost.is_empty()
    }
}
