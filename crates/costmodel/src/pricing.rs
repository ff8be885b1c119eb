//! Usage-to-cost pricing
//!
//! Converts the raw usage series of a workload into cost series using the
//! unit prices of its node (or a custom pricing override), a discount, the
//! cluster idle coefficient and the requested reporting cadence.

use crate::models::{CostData, NodeData, Vector};
use crate::vector::{round_timestamp, total_vectors, TIMESTAMP_PRECISION};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const HOURS_PER_DAY: f64 = 24.0;
pub const HOURS_PER_MONTH: f64 = 730.0;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Reporting cadence for cost values
///
/// Unit prices are hourly. Any unrecognized cadence string is treated exactly
/// like `"hourly"`; only the empty string means cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rate {
    #[default]
    Cumulative,
    Hourly,
    Daily,
    Monthly,
}

impl Rate {
    pub fn parse(s: &str) -> Self {
        match s {
            "" => Rate::Cumulative,
            "daily" => Rate::Daily,
            "monthly" => Rate::Monthly,
            _ => Rate::Hourly,
        }
    }

    /// Multiplier converting hourly prices into this cadence
    pub fn coefficient(&self) -> f64 {
        match self {
            Rate::Daily => HOURS_PER_DAY,
            Rate::Monthly => HOURS_PER_MONTH,
            Rate::Cumulative | Rate::Hourly => 1.0,
        }
    }

    pub fn is_cumulative(&self) -> bool {
        matches!(self, Rate::Cumulative)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rate::Cumulative => "",
            Rate::Hourly => "hourly",
            Rate::Daily => "daily",
            Rate::Monthly => "monthly",
        }
    }
}

impl FromStr for Rate {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Rate::parse(s))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::Cumulative => f.write_str("cumulative"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Caller-supplied override of node-derived unit prices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomPricing {
    pub enabled: bool,
    pub cpu: String,
    pub ram: String,
    pub gpu: String,
    #[serde(alias = "spot_cpu")]
    pub spot_cpu: String,
    #[serde(alias = "spot_ram")]
    pub spot_ram: String,
    #[serde(alias = "spot_gpu")]
    pub spot_gpu: String,
    pub storage: String,
}

impl CustomPricing {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Parse a price string, falling back to zero when it is malformed
///
/// A bad price must not abort a whole report, so the affected resource
/// simply costs nothing.
pub fn parse_price(s: &str) -> f64 {
    match s.parse::<f64>() {
        Ok(price) => price,
        Err(e) => {
            if !s.is_empty() {
                debug!(price = %s, error = %e, "Malformed price string, using zero");
            }
            0.0
        }
    }
}

/// Hourly unit prices selected for one workload
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnitPrices {
    pub cpu: f64,
    pub ram: f64,
    pub gpu: f64,
    pub storage: f64,
}

impl UnitPrices {
    /// Select unit prices from the node, replaced by custom pricing when enabled
    pub fn resolve(node: &NodeData, custom: Option<&CustomPricing>) -> Self {
        match custom.filter(|cp| cp.is_enabled()) {
            Some(cp) if node.is_spot() => Self {
                cpu: parse_price(&cp.spot_cpu),
                ram: parse_price(&cp.spot_ram),
                gpu: parse_price(&cp.spot_gpu),
                storage: parse_price(&cp.storage),
            },
            Some(cp) => Self {
                cpu: parse_price(&cp.cpu),
                ram: parse_price(&cp.ram),
                gpu: parse_price(&cp.gpu),
                storage: parse_price(&cp.storage),
            },
            None => Self {
                cpu: parse_price(&node.vcpu_cost),
                ram: parse_price(&node.ram_cost),
                gpu: parse_price(&node.gpu_cost),
                storage: parse_price(&node.storage_cost),
            },
        }
    }
}

/// Cost series of one workload, per resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceVectors {
    pub cpu: Vec<Vector>,
    pub ram: Vec<Vector>,
    pub gpu: Vec<Vector>,
    /// One series per bound volume; callers merge them
    pub pvs: Vec<Vec<Vector>>,
    pub network: Vec<Vector>,
}

impl PriceVectors {
    /// Total of CPU, RAM, GPU and volume costs
    pub fn resource_total(&self) -> f64 {
        total_vectors(&self.cpu)
            + total_vectors(&self.ram)
            + total_vectors(&self.gpu)
            + self.pvs.iter().map(|pv| total_vectors(pv)).sum::<f64>()
    }

    /// Total of every cost series, network included
    pub fn total(&self) -> f64 {
        self.resource_total() + total_vectors(&self.network)
    }
}

/// Price the usage series of a workload
///
/// Each sample costs `amount * unit_price * (1 - discount) / idle_coefficient`
/// scaled by the cadence multiplier. Memory and volume amounts are bytes and
/// are converted to GiB first. Volumes are never discounted, and network cost
/// is passed through untouched.
pub fn price_vectors(
    datum: &CostData,
    rate: Rate,
    discount: f64,
    idle_coefficient: f64,
    custom_pricing: Option<&CustomPricing>,
) -> PriceVectors {
    let prices = UnitPrices::resolve(&datum.node_data, custom_pricing);
    let custom_storage = custom_pricing.filter(|cp| cp.is_enabled()).is_some();
    let rate_coeff = rate.coefficient();
    let discounted = 1.0 - discount;

    let price = |series: &[Vector], unit_price: f64, scale: f64, discount_factor: f64| -> Vec<Vector> {
        series
            .iter()
            .map(|v| Vector {
                timestamp: round_timestamp(v.timestamp, TIMESTAMP_PRECISION),
                value: (v.value / scale * unit_price * discount_factor / idle_coefficient)
                    * rate_coeff,
            })
            .collect()
    };

    let pvs = datum
        .pvc_data
        .iter()
        .filter_map(|pvc| {
            let volume = pvc.volume.as_ref()?;
            let cost = if custom_storage {
                prices.storage
            } else {
                parse_price(&volume.cost)
            };
            Some(price(&pvc.values, cost, BYTES_PER_GIB, 1.0))
        })
        .collect();

    PriceVectors {
        cpu: price(&datum.cpu_allocation, prices.cpu, 1.0, discounted),
        ram: price(&datum.ram_allocation, prices.ram, BYTES_PER_GIB, discounted),
        gpu: price(&datum.gpu_requested, prices.gpu, 1.0, discounted),
        pvs,
        network: datum.network_cost.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PersistentVolume, PvcData};

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn node(cpu: &str, ram: &str, gpu: &str) -> NodeData {
        NodeData {
            usage_type: "ondemand".to_string(),
            vcpu_cost: cpu.to_string(),
            ram_cost: ram.to_string(),
            gpu_cost: gpu.to_string(),
            storage_cost: "0.0001".to_string(),
            ..Default::default()
        }
    }

    fn custom() -> CustomPricing {
        CustomPricing {
            enabled: true,
            cpu: "0.04".to_string(),
            ram: "0.005".to_string(),
            gpu: "0.9".to_string(),
            spot_cpu: "0.01".to_string(),
            spot_ram: "0.001".to_string(),
            spot_gpu: "0.3".to_string(),
            storage: "0.00005".to_string(),
        }
    }

    #[test]
    fn test_rate_parsing() {
        assert_eq!(Rate::parse(""), Rate::Cumulative);
        assert_eq!(Rate::parse("hourly"), Rate::Hourly);
        assert_eq!(Rate::parse("daily"), Rate::Daily);
        assert_eq!(Rate::parse("monthly"), Rate::Monthly);
        assert_eq!(Rate::parse("weekly"), Rate::Hourly);
        assert_eq!("daily".parse::<Rate>(), Ok(Rate::Daily));
        assert_eq!(Rate::Monthly.coefficient(), 730.0);
        assert_eq!(Rate::Daily.coefficient(), 24.0);
        assert_eq!(Rate::parse("bogus").coefficient(), 1.0);
    }

    #[test]
    fn test_cpu_cost_per_sample() {
        let datum = CostData {
            node_data: node("0.05", "0.01", "0"),
            cpu_allocation: vec![Vector::new(3600.0, 2.0)],
            ..Default::default()
        };

        let pv = price_vectors(&datum, Rate::Hourly, 0.0, 1.0, None);
        assert_eq!(pv.cpu.len(), 1);
        assert_eq!(pv.cpu[0].timestamp, 3600.0);
        assert!(approx_eq(pv.cpu[0].value, 0.1));
    }

    #[test]
    fn test_ram_cost_converts_bytes_to_gib() {
        let datum = CostData {
            node_data: node("0.05", "0.01", "0"),
            ram_allocation: vec![Vector::new(3600.0, 2_147_483_648.0)],
            ..Default::default()
        };

        let pv = price_vectors(&datum, Rate::Hourly, 0.0, 1.0, None);
        assert!(approx_eq(pv.ram[0].value, 0.02));
    }

    #[test]
    fn test_discount_idle_and_rate_applied() {
        let datum = CostData {
            node_data: node("1.0", "0", "2.0"),
            cpu_allocation: vec![Vector::new(14.0, 1.0)],
            gpu_requested: vec![Vector::new(16.0, 1.0)],
            ..Default::default()
        };

        let pv = price_vectors(&datum, Rate::Daily, 0.25, 0.5, None);
        // 1 * 1.0 * 0.75 / 0.5 * 24
        assert!(approx_eq(pv.cpu[0].value, 36.0));
        assert_eq!(pv.cpu[0].timestamp, 10.0);
        assert!(approx_eq(pv.gpu[0].value, 72.0));
        assert_eq!(pv.gpu[0].timestamp, 20.0);
    }

    #[test]
    fn test_malformed_price_is_zero() {
        assert_eq!(parse_price("not-a-number"), 0.0);
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("0.031611"), 0.031611);

        let datum = CostData {
            node_data: node("garbage", "0.01", "0"),
            cpu_allocation: vec![Vector::new(10.0, 4.0)],
            ..Default::default()
        };
        let pv = price_vectors(&datum, Rate::Cumulative, 0.0, 1.0, None);
        assert_eq!(pv.cpu[0].value, 0.0);
    }

    #[test]
    fn test_custom_pricing_on_demand_and_spot() {
        let cp = custom();
        let on_demand = UnitPrices::resolve(&node("1", "1", "1"), Some(&cp));
        assert_eq!(on_demand.cpu, 0.04);
        assert_eq!(on_demand.ram, 0.005);
        assert_eq!(on_demand.gpu, 0.9);
        assert_eq!(on_demand.storage, 0.00005);

        let mut spot_node = node("1", "1", "1");
        spot_node.usage_type = "spot".to_string();
        let spot = UnitPrices::resolve(&spot_node, Some(&cp));
        assert_eq!(spot.cpu, 0.01);
        assert_eq!(spot.ram, 0.001);
        assert_eq!(spot.gpu, 0.3);
        assert_eq!(spot.storage, 0.00005);
    }

    #[test]
    fn test_custom_pricing_accepts_both_key_styles() {
        let camel: CustomPricing =
            serde_json::from_str(r#"{"enabled": true, "spotCpu": "0.01"}"#).unwrap();
        let snake: CustomPricing =
            serde_json::from_str(r#"{"enabled": true, "spot_cpu": "0.01"}"#).unwrap();

        assert_eq!(camel, snake);
        assert_eq!(snake.spot_cpu, "0.01");
        assert_eq!(snake.spot_ram, "");
    }

    #[test]
    fn test_disabled_custom_pricing_is_ignored() {
        let mut cp = custom();
        cp.enabled = false;
        let prices = UnitPrices::resolve(&node("0.05", "0.01", "0.7"), Some(&cp));
        assert_eq!(prices.cpu, 0.05);
        assert_eq!(prices.ram, 0.01);
        assert_eq!(prices.gpu, 0.7);
        assert_eq!(prices.storage, 0.0001);
    }

    #[test]
    fn test_volumes_priced_independently_without_discount() {
        let gib = 1024.0 * 1024.0 * 1024.0;
        let datum = CostData {
            node_data: node("0", "0", "0"),
            pvc_data: vec![
                PvcData {
                    claim_name: "fast".to_string(),
                    volume: Some(PersistentVolume {
                        cost: "0.2".to_string(),
                        ..Default::default()
                    }),
                    values: vec![Vector::new(10.0, 10.0 * gib)],
                    ..Default::default()
                },
                PvcData {
                    claim_name: "unbound".to_string(),
                    volume: None,
                    values: vec![Vector::new(10.0, gib)],
                    ..Default::default()
                },
                PvcData {
                    claim_name: "slow".to_string(),
                    volume: Some(PersistentVolume {
                        cost: "0.1".to_string(),
                        ..Default::default()
                    }),
                    values: vec![Vector::new(10.0, 5.0 * gib)],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let pv = price_vectors(&datum, Rate::Hourly, 0.5, 1.0, None);
        assert_eq!(pv.pvs.len(), 2);
        assert!(approx_eq(pv.pvs[0][0].value, 2.0));
        assert!(approx_eq(pv.pvs[1][0].value, 0.5));

        let pv = price_vectors(&datum, Rate::Hourly, 0.0, 1.0, Some(&custom()));
        assert!(approx_eq(pv.pvs[0][0].value, 10.0 * 0.00005));
    }

    #[test]
    fn test_network_cost_passed_through() {
        let network = vec![Vector::new(13.0, 0.42), Vector::new(0.0, 1.0)];
        let datum = CostData {
            network_cost: network.clone(),
            ..Default::default()
        };

        let pv = price_vectors(&datum, Rate::Monthly, 0.5, 0.25, None);
        assert_eq!(pv.network, network);
        assert!(approx_eq(pv.total(), 1.42));
        assert_eq!(pv.resource_total(), 0.0);
    }
}
