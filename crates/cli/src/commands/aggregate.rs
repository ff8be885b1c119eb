//! Aggregated cost report command

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use costmodel::{
    aggregate_cost_data, Aggregation, AggregationOptions, CostData, GroupField, Rate,
};
use std::collections::{BTreeMap, HashMap};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use super::{load_idle_coefficients, resolve_discount};
use crate::config::KcostConfig;
use crate::input::load_cost_data;
use crate::output::{
    color_efficiency, format_cost, print_info, print_json, print_warning, OutputFormat,
};
use crate::AggregateArgs;

/// Row of the aggregated cost table
#[derive(Tabled)]
struct AggregationRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "RAM")]
    ram: String,
    #[tabled(rename = "GPU")]
    gpu: String,
    #[tabled(rename = "PV")]
    pv: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Shared")]
    shared: String,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
}

impl From<(&String, &Aggregation)> for AggregationRow {
    fn from((name, agg): (&String, &Aggregation)) -> Self {
        Self {
            name: name.clone(),
            cpu: format_cost(agg.cpu_cost),
            ram: format_cost(agg.ram_cost),
            gpu: format_cost(agg.gpu_cost),
            pv: format_cost(agg.pv_cost),
            network: format_cost(agg.network_cost),
            shared: format_cost(agg.shared_cost),
            total: format_cost(agg.total_cost),
            efficiency: color_efficiency(agg.efficiency),
        }
    }
}

/// Build the aggregation options from flags layered over configuration
fn build_options(
    args: &AggregateArgs,
    config: &KcostConfig,
    cost_data: &HashMap<String, CostData>,
) -> Result<AggregationOptions> {
    let discount = resolve_discount(args.discount, config)?;
    let rate = Rate::parse(args.rate.as_deref().unwrap_or(&config.rate));
    let shared = config.shared_resources.to_policy(
        args.share,
        &args.share_namespaces,
        &args.share_labels,
    )?;

    let mut options = AggregationOptions::default()
        .with_rate(rate)
        .with_discount(discount)
        .with_shared_resources(shared);

    let custom_pricing = config.custom_pricing();

    if let Some(billing) = &args.billing {
        let window = args.window.as_deref().unwrap_or(&config.window);
        let coefficients = load_idle_coefficients(
            cost_data,
            billing,
            custom_pricing.as_ref(),
            discount,
            window,
        )?;
        options = options.with_idle_coefficients(coefficients);
    }
    if let Some(custom_pricing) = custom_pricing {
        options = options.with_custom_pricing(custom_pricing);
    }
    if let Some(data_length) = args.data_length {
        options = options.with_data_length(data_length);
    }
    if args.efficiency {
        options = options.with_efficiency();
    }
    if args.time_series {
        options = options.with_time_series();
    }

    Ok(options)
}

/// Aggregate workload costs and print the report
pub fn run(args: &AggregateArgs, config: &KcostConfig, format: OutputFormat) -> Result<()> {
    let field: GroupField = args
        .field
        .parse()
        .context("Invalid aggregation field")?;
    let cost_data = load_cost_data(&args.input)?;
    let options = build_options(args, config, &cost_data)?;

    info!(
        field = %field,
        workloads = cost_data.len(),
        rate = %options.rate,
        "Running aggregation"
    );
    let aggregations = aggregate_cost_data(&cost_data, field, &args.subfields, &options);

    match format {
        OutputFormat::Json => print_json(&aggregations)?,
        OutputFormat::Table => print_report(field, &options, &aggregations),
    }

    Ok(())
}

fn print_report(
    field: GroupField,
    options: &AggregationOptions,
    aggregations: &BTreeMap<String, Aggregation>,
) {
    println!("{}", format!("Cost by {}", field).bold());
    println!("{}", "=".repeat(50));
    println!("Rate:      {}", options.rate.to_string().cyan());
    println!("Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    if aggregations.is_empty() {
        print_info("No workloads matched the requested grouping");
        return;
    }

    let rows: Vec<AggregationRow> = aggregations.iter().map(AggregationRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()).to_string());

    let total: f64 = aggregations.values().map(|a| a.total_cost).sum();
    println!();
    println!("Total:     {}", format_cost(total).green().bold());

    let anomalies: Vec<&str> = aggregations
        .iter()
        .filter(|(_, a)| a.has_efficiency_anomaly())
        .map(|(k, _)| k.as_str())
        .collect();
    if !anomalies.is_empty() {
        print_warning(&format!(
            "Efficiency outside [0, 1] for: {}",
            anomalies.join(", ")
        ));
    }
}
