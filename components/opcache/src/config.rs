//! Cache configuration.
//!
//! Loaded from JSON; missing fields take their defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adaptive::AdaptivePolicy;

/// Errors produced while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON or wrong field types
    #[error("invalid cache config: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value outside its domain
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Tunables of the call-site caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consecutive misses before a site switches mode or starts a new round
    pub failure_threshold: u8,
    /// Exhausted rounds before a global index site or a store site is
    /// disabled
    pub max_switches: u8,
    /// Executions of a code unit before its cache table is allocated
    pub activation_runs: u32,
    /// Whether global sites may switch to the index form
    pub global_index_mode: bool,
    /// Whether attribute stores are cached
    pub store_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            failure_threshold: 2,
            max_switches: 4,
            activation_runs: 1024,
            global_index_mode: true,
            store_cache: true,
        }
    }
}

impl CacheConfig {
    /// Defaults with the table allocated on the first run
    pub fn eager() -> Self {
        CacheConfig {
            activation_runs: 0,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check field domains
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "failure_threshold",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Thresholds for the adaptive state machine
    pub fn policy(&self) -> AdaptivePolicy {
        AdaptivePolicy {
            failure_threshold: self.failure_threshold,
            max_switches: self.max_switches,
            global_index_mode: self.global_index_mode,
        }
    }
}
