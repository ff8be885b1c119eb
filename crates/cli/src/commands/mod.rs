//! CLI subcommands

pub mod aggregate;
pub mod idle;

use anyhow::{Context, Result};
use costmodel::{compute_idle_coefficients, CostData, CustomPricing};
use std::collections::HashMap;

use crate::config::{validate_discount, KcostConfig};
use crate::input::FileClusterCostSource;

/// Resolve the discount from the flag or the configuration
fn resolve_discount(flag: Option<f64>, config: &KcostConfig) -> Result<f64> {
    let discount = flag.unwrap_or(config.discount);
    validate_discount(discount)?;
    Ok(discount)
}

/// Compute idle coefficients against a billing export
///
/// An export file covers a single window, so no offset is requested.
fn load_idle_coefficients(
    cost_data: &HashMap<String, CostData>,
    billing: &str,
    custom_pricing: Option<&CustomPricing>,
    discount: f64,
    window: &str,
) -> Result<HashMap<String, f64>> {
    let source = FileClusterCostSource::new(billing);
    compute_idle_coefficients(cost_data, &source, custom_pricing, discount, window, None)
        .with_context(|| format!("Failed to compute idle coefficients from {}", billing))
}
