//! Loading cost data and billing totals from disk

use anyhow::{bail, Context, Result};
use costmodel::{ClusterCostSource, ClusterCostTotals, CostData};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {} in {}", what, path.display()))
}

/// Load a JSON object mapping workload keys to usage records
pub fn load_cost_data(path: impl AsRef<Path>) -> Result<HashMap<String, CostData>> {
    let path = path.as_ref();
    let data: HashMap<String, CostData> = read_json(path, "cost data")?;
    debug!(path = %path.display(), workloads = data.len(), "Loaded cost data");
    Ok(data)
}

/// Billing totals exported to a JSON file, keyed by cluster id
///
/// The export already covers a single window, so the requested window is only
/// logged. Shifted windows cannot be served and are rejected.
#[derive(Debug, Clone)]
pub struct FileClusterCostSource {
    path: PathBuf,
}

impl FileClusterCostSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClusterCostSource for FileClusterCostSource {
    fn cluster_costs(
        &self,
        window: &str,
        offset: Option<&str>,
    ) -> Result<HashMap<String, ClusterCostTotals>> {
        if let Some(offset) = offset {
            bail!(
                "Billing export {} covers a single window, cannot apply offset {:?}",
                self.path.display(),
                offset
            );
        }
        let totals: HashMap<String, ClusterCostTotals> = read_json(&self.path, "billing totals")?;
        debug!(
            path = %self.path.display(),
            clusters = totals.len(),
            window,
            "Loaded billing totals"
        );
        Ok(totals)
    }
}
