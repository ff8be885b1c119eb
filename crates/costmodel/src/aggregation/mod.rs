//! Cost aggregation
//!
//! This module provides:
//! - Classification of workloads into buckets by a grouping field
//! - Accumulation of usage and priced cost vectors per bucket
//! - Finalization into scalar costs, shared-cost split, rate normalization
//!   and efficiency scores

mod efficiency;
mod record;
mod shared;


pub use efficiency::Efficiency;
pub use record::Aggregation;
pub use shared::{SharedResourceInfo, SYSTEM_NAMESPACE};

use crate::error::CostModelError;
use crate::models::CostData;
use crate::observability::{CostModelMetrics, ReportLogger};
use crate::pricing::{price_vectors, CustomPricing, Rate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::trace;

/// Workload attribute used to derive bucket keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupField {
    Cluster,
    Namespace,
    Service,
    Deployment,
    Daemonset,
    Label,
    Pod,
}

impl GroupField {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupField::Cluster => "cluster",
            GroupField::Namespace => "namespace",
            GroupField::Service => "service",
            GroupField::Deployment => "deployment",
            GroupField::Daemonset => "daemonset",
            GroupField::Label => "label",
            GroupField::Pod => "pod",
        }
    }

    /// Bucket key of a workload, or `None` if it lacks the required attribute
    ///
    /// For `Label`, the key is the value of the first label in `subfields`
    /// that the workload carries.
    pub fn bucket_key(&self, datum: &CostData, subfields: &[String]) -> Option<String> {
        let qualified = |names: &[String]| {
            names
                .first()
                .map(|name| format!("{}/{}", datum.namespace, name))
        };

        match self {
            GroupField::Cluster => Some(datum.cluster_id.clone()),
            GroupField::Namespace => Some(datum.namespace.clone()),
            GroupField::Service => qualified(&datum.services),
            GroupField::Deployment => qualified(&datum.deployments),
            GroupField::Daemonset => qualified(&datum.daemonsets),
            GroupField::Label => subfields
                .iter()
                .find_map(|sf| datum.labels.get(sf).cloned()),
            GroupField::Pod => Some(format!("{}/{}", datum.namespace, datum.pod_name)),
        }
    }
}

impl FromStr for GroupField {
    type Err = CostModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster" => Ok(GroupField::Cluster),
            "namespace" => Ok(GroupField::Namespace),
            "service" => Ok(GroupField::Service),
            "deployment" => Ok(GroupField::Deployment),
            "daemonset" => Ok(GroupField::Daemonset),
            "label" => Ok(GroupField::Label),
            "pod" => Ok(GroupField::Pod),
            other => Err(CostModelError::UnknownAggregationField(other.to_string())),
        }
    }
}

impl fmt::Display for GroupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional parameters of an aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregationOptions {
    /// Overrides node-derived unit prices when enabled
    pub custom_pricing: Option<CustomPricing>,
    /// Expected number of data points per cost vector; `None` or 0 means
    /// each bucket uses its own longest cost vector
    pub data_length: Option<usize>,
    /// Fraction by which CPU, RAM and GPU costs are discounted
    pub discount: f64,
    /// Per-cluster idle coefficients; missing clusters use 1.0
    pub idle_coefficients: HashMap<String, f64>,
    pub include_efficiency: bool,
    pub include_time_series: bool,
    pub rate: Rate,
    pub shared_resources: Option<SharedResourceInfo>,
}

impl AggregationOptions {
    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_custom_pricing(mut self, custom_pricing: CustomPricing) -> Self {
        self.custom_pricing = Some(custom_pricing);
        self
    }

    pub fn with_idle_coefficients(mut self, idle_coefficients: HashMap<String, f64>) -> Self {
        self.idle_coefficients = idle_coefficients;
        self
    }

    pub fn with_shared_resources(mut self, shared_resources: SharedResourceInfo) -> Self {
        self.shared_resources = Some(shared_resources);
        self
    }

    pub fn with_data_length(mut self, data_length: usize) -> Self {
        self.data_length = Some(data_length);
        self
    }

    pub fn with_efficiency(mut self) -> Self {
        self.include_efficiency = true;
        self
    }

    pub fn with_time_series(mut self) -> Self {
        self.include_time_series = true;
        self
    }

    fn idle_coefficient(&self, cluster: &str, logger: &ReportLogger) -> f64 {
        match self.idle_coefficients.get(cluster) {
            Some(&c) if c > 0.0 && c.is_finite() => c,
            Some(&c) => {
                logger.log_invalid_idle_coefficient(cluster, c);
                1.0
            }
            None => 1.0,
        }
    }
}

/// Aggregate raw workload cost data into one record per bucket key
///
/// Workloads are processed in key order so that results are reproducible.
/// Workloads matched by the shared-resource policy are pooled and split
/// evenly across all buckets; workloads lacking the attribute `field`
/// requires are skipped.
pub fn aggregate_cost_data(
    cost_data: &HashMap<String, CostData>,
    field: GroupField,
    subfields: &[String],
    opts: &AggregationOptions,
) -> BTreeMap<String, Aggregation> {
    let start = Instant::now();
    let logger = ReportLogger::new(field.as_str());
    let metrics = CostModelMetrics::new();
    logger.log_report_started(field.as_str(), cost_data.len(), opts.rate.as_str());

    let custom_pricing = opts.custom_pricing.as_ref();
    let mut aggregations: BTreeMap<String, Aggregation> = BTreeMap::new();

    // Running total of cost reported as shared across all other buckets
    let mut shared_resource_cost = 0.0;
    let mut shared_workloads = 0;
    let mut skipped_workloads = 0;

    let mut keys: Vec<&String> = cost_data.keys().collect();
    keys.sort();

    for datum in keys.into_iter().map(|k| &cost_data[k]) {
        let idle_coefficient = opts.idle_coefficient(&datum.cluster_id, &logger);

        let prices = price_vectors(datum, opts.rate, opts.discount, idle_coefficient, custom_pricing);

        if opts
            .shared_resources
            .as_ref()
            .is_some_and(|sr| sr.applies_to(datum))
        {
            shared_resource_cost += prices.total();
            shared_workloads += 1;
            metrics.inc_workloads_shared();
            trace!(namespace = %datum.namespace, pod = %datum.pod_name, "Pooled shared workload");
            continue;
        }

        let Some(key) = field.bucket_key(datum, subfields) else {
            skipped_workloads += 1;
            metrics.inc_workloads_skipped();
            continue;
        };

        aggregations
            .entry(key)
            .or_insert_with_key(|key| Aggregation::new(field, subfields, key.as_str()))
            .merge(datum, &prices);
        metrics.inc_workloads_aggregated();
    }

    let shared_cost_per_bucket = if aggregations.is_empty() {
        0.0
    } else {
        shared_resource_cost / aggregations.len() as f64
    };

    for (key, agg) in aggregations.iter_mut() {
        finalize(key, agg, shared_cost_per_bucket, opts, &logger);
    }

    let elapsed = start.elapsed();
    metrics.observe_aggregation_latency(elapsed.as_secs_f64());
    metrics.set_buckets_produced(aggregations.len() as i64);
    logger.log_report_completed(
        aggregations.len(),
        shared_workloads,
        skipped_workloads,
        shared_resource_cost,
        elapsed.as_millis(),
    );

    aggregations
}

fn finalize(
    key: &str,
    agg: &mut Aggregation,
    shared_cost: f64,
    opts: &AggregationOptions,
    logger: &ReportLogger,
) {
    agg.total_costs(shared_cost);

    if !opts.rate.is_cumulative() {
        let data_length = opts
            .data_length
            .filter(|&n| n > 0)
            .unwrap_or_else(|| agg.data_length());
        agg.normalize(data_length);
    }

    agg.sum_total_cost();

    if opts.include_efficiency {
        let scores = agg.score_efficiency();
        if scores.is_anomalous() {
            logger.log_efficiency_anomaly(key, scores.cpu, scores.ram, scores.overall);
        }
    }

    if !opts.include_time_series {
        agg.discard_time_series();
    }
}
