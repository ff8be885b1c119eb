//! Observability infrastructure for cost report generation
//!
//! Provides:
//! - Prometheus metrics (aggregation latency, workload counts, idle coefficients)
//! - Structured logging of report lifecycle events with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_gauge, GaugeVec,
    Histogram, IntCounter, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for aggregation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CostModelMetricsInner> = OnceLock::new();

struct CostModelMetricsInner {
    aggregation_latency_seconds: Histogram,
    workloads_aggregated: IntCounter,
    workloads_shared: IntCounter,
    workloads_skipped: IntCounter,
    buckets_produced: IntGauge,
    clusters_without_billing: IntCounter,
    idle_coefficient: GaugeVec,
}

impl CostModelMetricsInner {
    fn new() -> Self {
        Self {
            aggregation_latency_seconds: register_histogram!(
                "costmodel_aggregation_latency_seconds",
                "Time spent aggregating workload cost data into a report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register aggregation_latency_seconds"),

            workloads_aggregated: register_int_counter!(
                "costmodel_workloads_aggregated_total",
                "Workloads merged into a report bucket"
            )
            .expect("Failed to register workloads_aggregated"),

            workloads_shared: register_int_counter!(
                "costmodel_workloads_shared_total",
                "Workloads pooled as shared resources"
            )
            .expect("Failed to register workloads_shared"),

            workloads_skipped: register_int_counter!(
                "costmodel_workloads_skipped_total",
                "Workloads lacking the attribute required by the grouping field"
            )
            .expect("Failed to register workloads_skipped"),

            buckets_produced: register_int_gauge!(
                "costmodel_buckets_produced",
                "Number of buckets in the most recent report"
            )
            .expect("Failed to register buckets_produced"),

            clusters_without_billing: register_int_counter!(
                "costmodel_clusters_without_billing_total",
                "Clusters whose idle coefficient defaulted for lack of billing data"
            )
            .expect("Failed to register clusters_without_billing"),

            idle_coefficient: register_gauge_vec!(
                "costmodel_idle_coefficient",
                "Most recent idle coefficient per cluster",
                &["cluster"]
            )
            .expect("Failed to register idle_coefficient"),
        }
    }
}

/// Cost model metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct CostModelMetrics {
    _private: (),
}

impl Default for CostModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CostModelMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CostModelMetricsInner::new);
        Self { _private: () }
    }

    /// Render the default registry in the Prometheus text format
    ///
    /// Embedders that serve their own `/metrics` endpoint can scrape
    /// `prometheus::gather()` directly instead.
    pub fn render(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&prometheus::gather())
    }

    fn inner(&self) -> &CostModelMetricsInner {
        GLOBAL_METRICS.get_or_init(CostModelMetricsInner::new)
    }

    pub fn observe_aggregation_latency(&self, duration_secs: f64) {
        self.inner().aggregation_latency_seconds.observe(duration_secs);
    }

    pub fn inc_workloads_aggregated(&self) {
        self.inner().workloads_aggregated.inc();
    }

    pub fn inc_workloads_shared(&self) {
        self.inner().workloads_shared.inc();
    }

    pub fn inc_workloads_skipped(&self) {
        self.inner().workloads_skipped.inc();
    }

    pub fn set_buckets_produced(&self, count: i64) {
        self.inner().buckets_produced.set(count);
    }

    pub fn inc_clusters_without_billing(&self) {
        self.inner().clusters_without_billing.inc();
    }

    pub fn set_idle_coefficient(&self, cluster: &str, coefficient: f64) {
        self.inner()
            .idle_coefficient
            .with_label_values(&[cluster])
            .set(coefficient);
    }
}

/// Structured logger for report events
#[derive(Clone)]
pub struct ReportLogger {
    report: String,
}

impl ReportLogger {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
        }
    }

    pub fn log_report_started(&self, field: &str, workloads: usize, rate: &str) {
        debug!(
            event = "report_started",
            report = %self.report,
            field = %field,
            workloads = workloads,
            rate = %rate,
            "Aggregating cost data"
        );
    }

    pub fn log_report_completed(
        &self,
        buckets: usize,
        shared_workloads: usize,
        skipped_workloads: usize,
        shared_cost: f64,
        elapsed_ms: u128,
    ) {
        info!(
            event = "report_completed",
            report = %self.report,
            buckets = buckets,
            shared_workloads = shared_workloads,
            skipped_workloads = skipped_workloads,
            shared_cost = shared_cost,
            elapsed_ms = elapsed_ms,
            "Cost report aggregated"
        );
    }

    pub fn log_idle_coefficient(
        &self,
        cluster: &str,
        observed_cost: f64,
        cluster_cost: f64,
        coefficient: f64,
    ) {
        info!(
            event = "idle_coefficient",
            report = %self.report,
            cluster = %cluster,
            observed_cost = observed_cost,
            cluster_cost = cluster_cost,
            coefficient = coefficient,
            "Computed idle coefficient"
        );
    }

    pub fn log_missing_billing(&self, cluster: &str, reason: &str) {
        warn!(
            event = "missing_billing_data",
            report = %self.report,
            cluster = %cluster,
            reason = %reason,
            "No usable billing data for cluster, is it emitting data? Using coefficient 1.0"
        );
    }

    pub fn log_unobserved_cluster(&self, cluster: &str, cluster_cost: f64) {
        warn!(
            event = "unobserved_cluster",
            report = %self.report,
            cluster = %cluster,
            cluster_cost = cluster_cost,
            "Cluster is billed but no workload cost was observed, using coefficient 1.0"
        );
    }

    pub fn log_invalid_idle_coefficient(&self, cluster: &str, coefficient: f64) {
        warn!(
            event = "invalid_idle_coefficient",
            report = %self.report,
            cluster = %cluster,
            coefficient = coefficient,
            "Ignoring non-positive idle coefficient, using 1.0"
        );
    }

    pub fn log_efficiency_anomaly(
        &self,
        bucket: &str,
        cpu_efficiency: f64,
        ram_efficiency: f64,
        efficiency: f64,
    ) {
        warn!(
            event = "efficiency_anomaly",
            report = %self.report,
            bucket = %bucket,
            cpu_efficiency = cpu_efficiency,
            ram_efficiency = ram_efficiency,
            efficiency = efficiency,
            "Efficiency outside [0, 1], check requests against allocation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CostModelMetrics::new();

        metrics.observe_aggregation_latency(0.002);
        metrics.inc_workloads_aggregated();
        metrics.inc_workloads_shared();
        metrics.inc_workloads_skipped();
        metrics.set_buckets_produced(3);
        metrics.inc_clusters_without_billing();
        metrics.set_idle_coefficient("cluster-one", 0.5);

        let clone = metrics.clone();
        clone.set_idle_coefficient("cluster-one", 0.75);

        let text = metrics.render().unwrap();
        assert!(text.contains("costmodel_workloads_aggregated_total"));
        assert!(text.contains("costmodel_idle_coefficient{cluster=\"cluster-one\"} 0.75"));
    }

    #[test]
    fn test_report_logger_creation() {
        let logger = ReportLogger::new("namespace");
        assert_eq!(logger.report, "namespace");
        logger.log_unobserved_cluster("cluster-one", 12.5);
    }
}
