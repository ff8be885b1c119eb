//! Shared-resource policy
//!
//! Workloads matched by the policy are not billed to a bucket of their own;
//! their cost is pooled and split evenly across every other bucket.

use crate::error::{CostModelError, Result};
use crate::models::CostData;
use std::collections::{HashMap, HashSet};

/// Namespace whose cost is always shared when the policy is enabled
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Namespaces and label selectors identifying shared workloads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedResourceInfo {
    pub share_resources: bool,
    pub shared_namespaces: HashSet<String>,
    pub label_selectors: HashMap<String, String>,
}

impl SharedResourceInfo {
    /// Build a policy from namespaces and parallel label name/value lists
    ///
    /// `kube-system` is always included.
    pub fn new(
        share_resources: bool,
        shared_namespaces: &[String],
        label_names: &[String],
        label_values: &[String],
    ) -> Result<Self> {
        if label_names.len() != label_values.len() {
            return Err(CostModelError::LabelSelectorMismatch {
                names: label_names.len(),
                values: label_values.len(),
            });
        }

        let mut shared_namespaces: HashSet<String> = shared_namespaces.iter().cloned().collect();
        shared_namespaces.insert(SYSTEM_NAMESPACE.to_string());

        let label_selectors = label_names
            .iter()
            .cloned()
            .zip(label_values.iter().cloned())
            .collect();

        Ok(Self {
            share_resources,
            shared_namespaces,
            label_selectors,
        })
    }

    /// Returns true if the workload's namespace or labels match the policy
    pub fn is_shared_resource(&self, datum: &CostData) -> bool {
        if self.shared_namespaces.contains(&datum.namespace) {
            return true;
        }
        self.label_selectors
            .iter()
            .any(|(name, value)| datum.labels.get(name) == Some(value))
    }

    /// Returns true if the policy is enabled and matches the workload
    pub fn applies_to(&self, datum: &CostData) -> bool {
        self.share_resources && self.is_shared_resource(datum)
    }
}
