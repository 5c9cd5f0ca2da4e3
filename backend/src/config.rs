//! Pipeline configuration
//!
//! One serde document groups the settings of every stage. Missing sections
//! and fields fall back to their defaults.
//!
//! ```json
//! {
//!   "balancer": { "max_iterations": 250, "total_col": "Totali" },
//!   "cost": { "primary_sector": "AAProduction" }
//! }
//! ```

use crate::assembly::{CostConfig, ExportLayout};
use crate::balancer::BalancerConfig;
use crate::builder::BuilderConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Largest accepted `balancer.decimal_places`
pub const MAX_DECIMAL_PLACES: u32 = 15;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Config could not be parsed: {0}")]
    Parse(String),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub builder: BuilderConfig,
    pub balancer: BalancerConfig,
    pub cost: CostConfig,
    pub export: ExportLayout,
}

impl PipelineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let balancer = &self.balancer;
        if balancer.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "balancer.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if balancer.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ConfigError::Invalid {
                field: "balancer.decimal_places",
                reason: format!(
                    "must be at most {}, got {}",
                    MAX_DECIMAL_PLACES, balancer.decimal_places
                ),
            });
        }
        if balancer.target_threshold.is_nan() || balancer.target_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "balancer.target_threshold",
                reason: format!("must be non-negative, got {}", balancer.target_threshold),
            });
        }
        if balancer.total_row.is_empty() || balancer.total_col.is_empty() {
            return Err(ConfigError::Invalid {
                field: "balancer.total_row/total_col",
                reason: "labels must not be empty".to_string(),
            });
        }
        if balancer.total_row == balancer.total_col {
            return Err(ConfigError::Invalid {
                field: "balancer.total_row/total_col",
                reason: format!("both labelled '{}'", balancer.total_row),
            });
        }
        if self.cost.primary_sector.is_empty() {
            return Err(ConfigError::Invalid {
                field: "cost.primary_sector",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Deterministic SHA-256 of the configuration
    ///
    /// serde_json objects keep their keys sorted, so equal configs hash
    /// equally.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let value = serde_json::to_value(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let json = serde_json::to_string(&value).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
