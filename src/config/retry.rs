//! Retry and circuit-breaker configuration

use super::ConfigError;
use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backoff strategy used when computing retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// base × exponential_base^attempt
    ExponentialBackoff,
    /// base × (attempt + 1)
    LinearBackoff,
    /// base, regardless of attempt
    FixedDelay,
    /// Learned per-error-kind base blended with recent failure gaps,
    /// then exponential growth on top
    Adaptive,
}

/// Retry and circuit-breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay: f64,
    /// Delay ceiling in seconds
    #[serde(default = "default_max_delay")]
    pub max_delay: f64,
    /// Growth factor for exponential strategies (must be > 1)
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,
    /// Apply ±10% random jitter to computed delays
    #[serde(default = "default_true")]
    pub jitter: bool,
    /// Backoff strategy
    #[serde(default = "RetryStrategy::default")]
    pub strategy: RetryStrategy,
    /// Consecutive failures before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a half-open probe
    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout: f64,
    /// Successes needed in half-open to close the circuit
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Delay multiplier for rate-limit errors
    #[serde(default = "default_rate_limit_multiplier")]
    pub rate_limit_multiplier: f64,
    /// Delay multiplier for connection errors
    #[serde(default = "default_connection_multiplier")]
    pub connection_multiplier: f64,
    /// Delay multiplier for generic API errors
    #[serde(default = "default_api_multiplier")]
    pub api_multiplier: f64,
    /// Where the learned-history snapshot is persisted
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Persist the snapshot every N total requests
    #[serde(default = "default_snapshot_every")]
    pub snapshot_every: u64,
}

impl RetryConfig {
    /// Reject values the runtime cannot represent, such as negative or
    /// non-finite durations
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_delay.is_finite() && self.base_delay >= 0.0) {
            return Err(ConfigError::Invalid(
                "retry.base_delay must be finite and non-negative".into(),
            ));
        }
        if !(self.max_delay.is_finite() && self.max_delay > 0.0) {
            return Err(ConfigError::Invalid(
                "retry.max_delay must be finite and positive".into(),
            ));
        }
        if !(self.exponential_base.is_finite() && self.exponential_base >= 1.0) {
            return Err(ConfigError::Invalid(
                "retry.exponential_base must be finite and at least 1".into(),
            ));
        }
        if !(self.recovery_timeout.is_finite() && self.recovery_timeout >= 0.0) {
            return Err(ConfigError::Invalid(
                "retry.recovery_timeout must be finite and non-negative".into(),
            ));
        }
        for (name, value) in [
            ("rate_limit_multiplier", self.rate_limit_multiplier),
            ("connection_multiplier", self.connection_multiplier),
            ("api_multiplier", self.api_multiplier),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "retry.{name} must be finite and positive"
                )));
            }
        }
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            return Err(ConfigError::Invalid(
                "retry circuit-breaker thresholds must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::ExponentialBackoff
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            exponential_base: default_exponential_base(),
            jitter: true,
            strategy: RetryStrategy::default(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout: default_recovery_timeout(),
            success_threshold: default_success_threshold(),
            rate_limit_multiplier: default_rate_limit_multiplier(),
            connection_multiplier: default_connection_multiplier(),
            api_multiplier: default_api_multiplier(),
            snapshot_path: default_snapshot_path(),
            snapshot_every: default_snapshot_every(),
        }
    }
}
