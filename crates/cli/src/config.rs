//! Configuration management for the CLI
//!
//! Settings are read from an optional file layered under `KCOST_`-prefixed
//! environment variables (`__` separates nested keys, e.g.
//! `KCOST_CUSTOM_PRICING__CPU=0.03`). Command-line flags override both.

use anyhow::{bail, Context, Result};
use costmodel::{CustomPricing, SharedResourceInfo};
use serde::Deserialize;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KcostConfig {
    /// Discount applied to CPU, RAM and GPU costs
    pub discount: f64,
    /// Default cost cadence; empty means cumulative
    pub rate: String,
    /// Default billing lookback window
    pub window: String,
    pub custom_pricing: Option<CustomPricing>,
    pub shared_resources: SharedResourcesConfig,
}

impl Default for KcostConfig {
    fn default() -> Self {
        Self {
            discount: 0.0,
            rate: String::new(),
            window: default_window(),
            custom_pricing: None,
            shared_resources: SharedResourcesConfig::default(),
        }
    }
}

fn default_window() -> String {
    "24h".to_string()
}

/// Shared-resource policy settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SharedResourcesConfig {
    pub enabled: bool,
    pub namespaces: Vec<String>,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
}

impl SharedResourcesConfig {
    /// Merge command-line overrides and build the policy
    ///
    /// `labels` are `name=value` selectors added to the configured ones.
    pub fn to_policy(
        &self,
        enable: bool,
        namespaces: &[String],
        labels: &[String],
    ) -> Result<SharedResourceInfo> {
        let mut all_namespaces = self.namespaces.clone();
        all_namespaces.extend(namespaces.iter().cloned());

        let mut names = self.label_names.clone();
        let mut values = self.label_values.clone();
        for selector in labels {
            let (name, value) = selector
                .split_once('=')
                .with_context(|| format!("Invalid label selector {:?}, expected name=value", selector))?;
            names.push(name.to_string());
            values.push(value.to_string());
        }

        SharedResourceInfo::new(self.enabled || enable, &all_namespaces, &names, &values)
            .context("Invalid shared resource configuration")
    }
}

impl KcostConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path).required(true)),
            None => match Self::default_path() {
                Some(default) => builder.add_source(
                    config::File::with_name(&default.to_string_lossy()).required(false),
                ),
                None => builder,
            },
        };

        let config = builder
            .add_source(
                config::Environment::with_prefix("KCOST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("shared_resources.namespaces")
                    .with_list_parse_key("shared_resources.label_names")
                    .with_list_parse_key("shared_resources.label_values"),
            )
            .build()
            .context("Failed to read configuration")?;

        let config: KcostConfig = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_discount(self.discount)
    }

    pub fn custom_pricing(&self) -> Option<CustomPricing> {
        self.custom_pricing.clone()
    }

    /// Default configuration file location, without extension
    fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("kcost").join("config"))
    }
}

/// Discounts must lie in [0, 1)
pub fn validate_discount(discount: f64) -> Result<()> {
    if !(0.0..1.0).contains(&discount) {
        bail!("Discount must be in [0, 1), got {}", discount);
    }
    Ok(())
}
