//! Idle coefficient estimation
//!
//! Relates the cost observed on monitored workloads to what a cluster was
//! actually billed over a lookback window. The resulting per-cluster
//! coefficient divides every priced sample in the main aggregation pass.

use crate::error::{CostModelError, Result};
use crate::models::{BillingSample, ClusterCostTotals, CostData};
use crate::observability::{CostModelMetrics, ReportLogger};
use crate::pricing::{price_vectors, CustomPricing, Rate, HOURS_PER_MONTH};
use chrono::Duration;
use std::collections::{BTreeSet, HashMap};

/// Source of actual per-cluster billing totals
///
/// Implementations run one synchronous query per call; failures are returned
/// to the caller without retry.
pub trait ClusterCostSource {
    /// Billing totals for every known cluster over `window`, optionally
    /// shifted back by `offset`
    fn cluster_costs(
        &self,
        window: &str,
        offset: Option<&str>,
    ) -> anyhow::Result<HashMap<String, ClusterCostTotals>>;
}

impl ClusterCostSource for HashMap<String, ClusterCostTotals> {
    fn cluster_costs(
        &self,
        _window: &str,
        _offset: Option<&str>,
    ) -> anyhow::Result<HashMap<String, ClusterCostTotals>> {
        Ok(self.clone())
    }
}

/// Parse a lookback window such as `24h`, `90m`, `1h30m`, `1.5h` or `7d`
pub fn parse_window(window: &str) -> Result<Duration> {
    let invalid = || CostModelError::InvalidWindow(window.to_string());

    let s = window.trim();
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total_ms = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_end == 0 {
            return Err(invalid());
        }
        let amount: f64 = rest[..number_end].parse().map_err(|_| invalid())?;
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_ms = match &rest[..unit_end] {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            "d" => 86_400_000.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_end..];

        total_ms += amount * unit_ms;
    }

    if total_ms <= 0.0 || !total_ms.is_finite() {
        return Err(invalid());
    }

    Ok(Duration::milliseconds(total_ms.round() as i64))
}

fn window_hours(window: &Duration) -> f64 {
    window.num_milliseconds() as f64 / 3_600_000.0
}

fn parse_billing_total(
    cluster: &str,
    field: &'static str,
    samples: &[BillingSample],
) -> Result<f64> {
    let value = samples.first().map(|s| s[1].as_str()).unwrap_or_default();
    value
        .parse::<f64>()
        .map_err(|source| CostModelError::InvalidBillingTotal {
            cluster: cluster.to_string(),
            field,
            value: value.to_string(),
            source,
        })
}

/// Compute the idle coefficient of every cluster present in `cost_data`
///
/// A cluster with no billing data, or whose workloads cost nothing, gets
/// coefficient 1.0. Any malformed billing total aborts the whole computation.
pub fn compute_idle_coefficients<S: ClusterCostSource + ?Sized>(
    cost_data: &HashMap<String, CostData>,
    source: &S,
    custom_pricing: Option<&CustomPricing>,
    discount: f64,
    window: &str,
    offset: Option<&str>,
) -> Result<HashMap<String, f64>> {
    let window_duration = parse_window(window)?;
    let all_totals = source
        .cluster_costs(window, offset)
        .map_err(CostModelError::BillingQuery)?;

    let logger = ReportLogger::new("idle");
    let metrics = CostModelMetrics::new();

    let clusters: BTreeSet<&str> = cost_data.values().map(|d| d.cluster_id.as_str()).collect();
    let mut coefficients = HashMap::with_capacity(clusters.len());

    for cluster in clusters {
        let totals = match all_totals.get(cluster) {
            Some(totals) if totals.has_data() => totals,
            _ => {
                logger.log_missing_billing(cluster, "no billing samples");
                metrics.inc_clusters_without_billing();
                coefficients.insert(cluster.to_string(), 1.0);
                continue;
            }
        };

        let cpu_cost = parse_billing_total(cluster, "cpu", &totals.cpu_cost)?;
        let mem_cost = parse_billing_total(cluster, "memory", &totals.mem_cost)?;
        let storage_cost = parse_billing_total(cluster, "storage", &totals.storage_cost)?;

        // Storage is never discounted
        let total_cluster_cost =
            cpu_cost * (1.0 - discount) + mem_cost * (1.0 - discount) + storage_cost;
        let cluster_cost_over_window =
            total_cluster_cost / HOURS_PER_MONTH * window_hours(&window_duration);

        if cluster_cost_over_window <= 0.0 || !cluster_cost_over_window.is_finite() {
            logger.log_missing_billing(cluster, "billed cost is zero");
            metrics.inc_clusters_without_billing();
            coefficients.insert(cluster.to_string(), 1.0);
            continue;
        }

        let observed_cost: f64 = cost_data
            .values()
            .filter(|d| d.cluster_id == cluster)
            .map(|d| {
                price_vectors(d, Rate::Cumulative, discount, 1.0, custom_pricing).resource_total()
            })
            .sum();

        if observed_cost <= 0.0 || !observed_cost.is_finite() {
            logger.log_unobserved_cluster(cluster, cluster_cost_over_window);
            metrics.inc_clusters_without_billing();
            coefficients.insert(cluster.to_string(), 1.0);
            continue;
        }

        let coefficient = observed_cost / cluster_cost_over_window;
        logger.log_idle_coefficient(cluster, observed_cost, cluster_cost_over_window, coefficient);
        metrics.set_idle_coefficient(cluster, coefficient);
        coefficients.insert(cluster.to_string(), coefficient);
    }

    Ok(coefficients)
}
