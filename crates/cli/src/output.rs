//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dump the cost model metrics in the Prometheus text format to stderr
pub fn print_metrics() -> anyhow::Result<()> {
    let text = costmodel::CostModelMetrics::new().render()?;
    eprint!("{}", text);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a cost amount
pub fn format_cost(amount: f64) -> String {
    if amount != 0.0 && amount.abs() < 0.01 {
        format!("{:.4}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Format a ratio as percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Color an efficiency score; values outside [0, 1] are flagged
pub fn color_efficiency(efficiency: Option<f64>) -> String {
    let Some(value) = efficiency else {
        return "-".to_string();
    };
    let formatted = format_percent(value);
    if !(0.0..=1.0).contains(&value) {
        format!("{}!", formatted).red().bold().to_string()
    } else if value >= 0.6 {
        formatted.green().to_string()
    } else if value >= 0.3 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color an idle coefficient; anything other than 1.0 means billing differed
pub fn color_coefficient(coefficient: f64) -> String {
    let formatted = format!("{:.4}", coefficient);
    if (coefficient - 1.0).abs() < f64::EPSILON {
        formatted.normal().to_string()
    } else if coefficient < 1.0 {
        formatted.yellow().to_string()
    } else {
        formatted.cyan().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(12.345), "12.35");
        assert_eq!(format_cost(0.0), "0.00");
        assert_eq!(format_cost(0.00123), "0.0012");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.5), "50%");
        assert_eq!(format_percent(1.25), "125%");
    }

    #[test]
    fn test_color_efficiency_missing() {
        assert_eq!(color_efficiency(None), "-");
    }

    #[test]
    fn test_color_efficiency_flags_anomaly() {
        colored::control::set_override(false);
        assert_eq!(color_efficiency(Some(1.5)), "150%!");
        assert_eq!(color_efficiency(Some(0.75)), "75%");
    }
}
