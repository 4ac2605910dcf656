//! Resilience framework configuration

use super::ConfigError;
use super::defaults::*;
use serde::{Deserialize, Serialize};

/// Configuration for health tracking, fallback caching, and dead letters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// How long a cached successful response stays eligible as a fallback,
    /// in seconds
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl: f64,
    /// Maximum number of fallback cache entries
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: u64,
    /// Success rate below which an endpoint is reported degraded
    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: f64,
    /// Success rate below which an endpoint is reported unhealthy
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: f64,
    /// Maximum dead-letter entries retained; the oldest are dropped beyond it
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

impl FrameworkConfig {
    /// Reject values the runtime cannot represent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fallback_ttl.is_finite() && self.fallback_ttl > 0.0) {
            return Err(ConfigError::Invalid(
                "framework.fallback_ttl must be finite and positive".into(),
            ));
        }
        for (name, value) in [
            ("degraded_threshold", self.degraded_threshold),
            ("unhealthy_threshold", self.unhealthy_threshold),
        ] {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(ConfigError::Invalid(format!(
                    "framework.{name} must be between 0 and 1"
                )));
            }
        }
        if self.unhealthy_threshold > self.degraded_threshold {
            return Err(ConfigError::Invalid(
                "framework.unhealthy_threshold exceeds degraded_threshold".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            fallback_ttl: default_fallback_ttl(),
            max_cache_entries: default_max_cache_entries(),
            degraded_threshold: default_degraded_threshold(),
            unhealthy_threshold: default_unhealthy_threshold(),
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}
