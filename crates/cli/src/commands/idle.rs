//! Idle coefficient command

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use super::{load_idle_coefficients, resolve_discount};
use crate::config::KcostConfig;
use crate::input::load_cost_data;
use crate::output::{color_coefficient, print_info, print_json, OutputFormat};
use crate::IdleArgs;

#[derive(Tabled)]
struct CoefficientRow {
    #[tabled(rename = "Cluster")]
    cluster: String,
    #[tabled(rename = "Idle Coefficient")]
    coefficient: String,
}

/// Compute and print the idle coefficient of every cluster in the input
pub fn run(args: &IdleArgs, config: &KcostConfig, format: OutputFormat) -> Result<()> {
    let discount = resolve_discount(args.discount, config)?;
    let window = args.window.as_deref().unwrap_or(&config.window);
    let custom_pricing = config.custom_pricing();

    let cost_data = load_cost_data(&args.input)?;
    let coefficients: BTreeMap<String, f64> = load_idle_coefficients(
        &cost_data,
        &args.billing,
        custom_pricing.as_ref(),
        discount,
        window,
    )?
    .into_iter()
    .collect();

    match format {
        OutputFormat::Json => print_json(&coefficients)?,
        OutputFormat::Table => {
            println!("{}", "Idle Coefficients".bold());
            println!("{}", "=".repeat(50));
            println!("Window:    {}", window.cyan());
            println!();

            if coefficients.is_empty() {
                print_info("No clusters found in input");
                return Ok(());
            }

            let rows: Vec<CoefficientRow> = coefficients
                .iter()
                .map(|(cluster, &c)| CoefficientRow {
                    cluster: cluster.clone(),
                    coefficient: color_coefficient(c),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
        }
    }

    Ok(())
}
