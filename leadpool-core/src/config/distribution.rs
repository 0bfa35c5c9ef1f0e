//! Distribution configuration: batch size and priority tiers

use crate::classification::Classification;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Leads handed out per replenishment
    /// Env: LP_BATCH_SIZE
    /// Default: 10
    pub batch_size: usize,

    /// Tier A lead type labels
    /// Env: LP_HIGH_PRIORITY_TYPES (comma-separated)
    pub high_priority_types: Vec<String>,

    /// Tier B lead type labels; every other type when unset
    /// Env: LP_LOW_PRIORITY_TYPES (comma-separated)
    pub low_priority_types: Option<Vec<String>>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::distribution::DEFAULT_BATCH_SIZE,
            high_priority_types: Classification::DEFAULT_HIGH_PRIORITY
                .iter()
                .map(|t| t.label().to_string())
                .collect(),
            low_priority_types: None,
        }
    }
}

fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

impl DistributionConfig {
    pub fn merge(&mut self, other: Self) {
        self.batch_size = other.batch_size;
        self.high_priority_types = other.high_priority_types;
        self.low_priority_types = other.low_priority_types;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(size) = env::var("LP_BATCH_SIZE") {
            if let Ok(s) = size.parse() {
                self.batch_size = s;
            }
        }

        if let Ok(types) = env::var("LP_HIGH_PRIORITY_TYPES") {
            self.high_priority_types = split_labels(&types);
        }

        if let Ok(types) = env::var("LP_LOW_PRIORITY_TYPES") {
            self.low_priority_types = Some(split_labels(&types));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("Invalid batch_size: must be at least 1");
        }
        if let Err(e) = self.classification() {
            bail!("Invalid priority tiers: {}", e);
        }
        Ok(())
    }

    /// Build the tier tables
    pub fn classification(&self) -> crate::Result<Classification> {
        Classification::from_labels(&self.high_priority_types, self.low_priority_types.as_deref())
    }
}
