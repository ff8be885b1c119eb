//! Cluster Cost Model CLI
//!
//! A command-line tool for turning collected workload usage into priced,
//! grouped cost reports and for inspecting per-cluster idle coefficients.

mod commands;
mod config;
mod input;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{aggregate, idle};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cluster Cost Model CLI
#[derive(Parser)]
#[command(name = "kcost")]
#[command(author, version, about = "CLI for the Cluster Cost Model", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (defaults to ~/.config/kcost/config)
    #[arg(long, env = "KCOST_CONFIG_FILE")]
    pub config: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Print collected Prometheus metrics to stderr after the command
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate workload costs into a grouped report
    Aggregate(AggregateArgs),

    /// Compute per-cluster idle coefficients from billing totals
    Idle(IdleArgs),
}

#[derive(Args)]
pub struct AggregateArgs {
    /// JSON file mapping workload keys to usage records
    #[arg(long, short)]
    pub input: String,

    /// Grouping field (cluster, namespace, service, deployment, daemonset, label, pod)
    #[arg(long, default_value = "namespace")]
    pub field: String,

    /// Label names to group by, in priority order (for --field label)
    #[arg(long, value_delimiter = ',')]
    pub subfields: Vec<String>,

    /// Cost cadence: hourly, daily or monthly (cumulative if not set)
    #[arg(long)]
    pub rate: Option<String>,

    /// Discount applied to CPU, RAM and GPU costs, in [0, 1)
    #[arg(long)]
    pub discount: Option<f64>,

    /// Expected number of data points per cost vector
    #[arg(long)]
    pub data_length: Option<usize>,

    /// Include CPU, RAM and overall efficiency scores
    #[arg(long)]
    pub efficiency: bool,

    /// Include per-resource cost time series
    #[arg(long)]
    pub time_series: bool,

    /// JSON file with per-cluster billing totals; enables idle correction
    #[arg(long)]
    pub billing: Option<String>,

    /// Billing lookback window (e.g. 24h, 7d)
    #[arg(long)]
    pub window: Option<String>,

    /// Pool shared namespaces and labels across all other buckets
    #[arg(long)]
    pub share: bool,

    /// Additional namespaces whose cost is shared
    #[arg(long, value_delimiter = ',')]
    pub share_namespaces: Vec<String>,

    /// Label selectors whose cost is shared (name=value)
    #[arg(long, value_delimiter = ',')]
    pub share_labels: Vec<String>,
}

#[derive(Args)]
pub struct IdleArgs {
    /// JSON file mapping workload keys to usage records
    #[arg(long, short)]
    pub input: String,

    /// JSON file with per-cluster billing totals
    #[arg(long)]
    pub billing: String,

    /// Billing lookback window (e.g. 24h, 7d)
    #[arg(long)]
    pub window: Option<String>,

    /// Discount applied to CPU and RAM costs, in [0, 1)
    #[arg(long)]
    pub discount: Option<f64>,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::KcostConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Aggregate(args) => aggregate::run(args, &config, cli.format)?,
        Commands::Idle(args) => idle::run(args, &config, cli.format)?,
    }

    if cli.metrics {
        output::print_metrics()?;
    }

    Ok(())
}
