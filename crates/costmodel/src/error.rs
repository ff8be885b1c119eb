//! Error types for cost model computations

use std::num::ParseFloatError;
use thiserror::Error;

/// Errors that can abort a cost model computation
#[derive(Error, Debug)]
pub enum CostModelError {
    #[error("Invalid window duration: {0:?}")]
    InvalidWindow(String),

    #[error("Invalid {field} total for cluster {cluster}: {value:?}")]
    InvalidBillingTotal {
        cluster: String,
        field: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("Cluster cost query failed: {0:#}")]
    BillingQuery(anyhow::Error),

    #[error("Unknown aggregation field: {0:?}")]
    UnknownAggregationField(String),

    #[error("Shared label selectors mismatch: {names} names, {values} values")]
    LabelSelectorMismatch { names: usize, values: usize },
}

pub type Result<T> = std::result::Result<T, CostModelError>;
