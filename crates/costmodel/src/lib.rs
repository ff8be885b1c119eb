//! Cost model library for cluster workload cost reporting
//!
//! This crate provides the core functionality for:
//! - Aligning and merging independently sampled time series
//! - Pricing raw resource usage into cost series
//! - Estimating per-cluster idle coefficients from billing totals
//! - Aggregating workloads into grouped cost and efficiency reports

pub mod aggregation;
pub mod error;
pub mod idle;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod vector;

pub use aggregation::{
    aggregate_cost_data, Aggregation, AggregationOptions, Efficiency, GroupField,
    SharedResourceInfo,
};
pub use error::{CostModelError, Result};
pub use idle::{compute_idle_coefficients, parse_window, ClusterCostSource};
pub use models::*;
pub use observability::{CostModelMetrics, ReportLogger};
pub use pricing::{price_vectors, CustomPricing, PriceVectors, Rate, UnitPrices};
pub use vector::{add_vectors, round_timestamp};
