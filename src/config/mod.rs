//! Configuration for the resilience layer
//!
//! Plain serde structs with defaults for every field. There is deliberately
//! no CLI or environment-variable surface here; applications compose these
//! structs at their own configuration boundary.

mod defaults;
mod framework;
mod rate_limit;
mod retry;

pub use framework::FrameworkConfig;
pub use rate_limit::RateLimitConfig;
pub use retry::{RetryConfig, RetryStrategy};

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading configuration from a file or string
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The YAML document did not parse
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The JSON document did not parse
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    /// The document parsed but a value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration aggregating all three components
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Retry and circuit-breaker tunables
    #[serde(default)]
    pub retry: RetryConfig,
    /// Rate limiter tunables
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Health, fallback, and dead-letter tunables
    #[serde(default)]
    pub framework: FrameworkConfig,
}

impl ResilienceConfig {
    /// Check every section for values the runtime cannot represent
    /// (negative or non-finite durations, degenerate thresholds)
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.rate_limit.validate()?;
        self.framework.validate()
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, dispatching on the extension (`.json` is JSON,
    /// anything else is treated as YAML)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }
}
