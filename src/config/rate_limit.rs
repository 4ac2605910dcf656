//! Rate limiter configuration

use super::ConfigError;
use super::defaults::*;
use serde::{Deserialize, Serialize};

/// Configuration for the self-tuning token-bucket rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Initial refill rate; the control loop adjusts this at runtime
    #[serde(default = "default_tokens_per_second")]
    pub tokens_per_second: f64,
    /// Steady-state token ceiling
    #[serde(default = "default_bucket_capacity")]
    pub bucket_capacity: f64,
    /// Ceiling applied when refunding abandoned grants; may exceed
    /// `bucket_capacity` briefly
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: f64,
    /// Control-loop setpoint, in seconds of observed response time
    #[serde(default = "default_target_response_time")]
    pub target_response_time: f64,
    /// Seconds between rate adjustments
    #[serde(default = "default_adjustment_interval")]
    pub adjustment_interval: f64,
    /// Additive-increase step and multiplicative-decrease fraction
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: f64,
    /// Lower bound for the tuned rate
    #[serde(default = "default_min_tokens_per_second")]
    pub min_tokens_per_second: f64,
    /// Upper bound for the tuned rate
    #[serde(default = "default_max_tokens_per_second")]
    pub max_tokens_per_second: f64,
}

impl RateLimitConfig {
    /// Reject values the runtime cannot represent
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("tokens_per_second", self.tokens_per_second),
            ("bucket_capacity", self.bucket_capacity),
            ("burst_capacity", self.burst_capacity),
            ("min_tokens_per_second", self.min_tokens_per_second),
            ("max_tokens_per_second", self.max_tokens_per_second),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "rate_limit.{name} must be finite and non-negative"
                )));
            }
        }
        for (name, value) in [
            ("target_response_time", self.target_response_time),
            ("adjustment_interval", self.adjustment_interval),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "rate_limit.{name} must be finite and positive"
                )));
            }
        }
        if !(self.adjustment_factor.is_finite()
            && self.adjustment_factor > 0.0
            && self.adjustment_factor < 1.0)
        {
            return Err(ConfigError::Invalid(
                "rate_limit.adjustment_factor must be between 0 and 1".into(),
            ));
        }
        if self.min_tokens_per_second > self.max_tokens_per_second {
            return Err(ConfigError::Invalid(
                "rate_limit.min_tokens_per_second exceeds max_tokens_per_second".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tokens_per_second: default_tokens_per_second(),
            bucket_capacity: default_bucket_capacity(),
            burst_capacity: default_burst_capacity(),
            target_response_time: default_target_response_time(),
            adjustment_interval: default_adjustment_interval(),
            adjustment_factor: default_adjustment_factor(),
            min_tokens_per_second: default_min_tokens_per_second(),
            max_tokens_per_second: default_max_tokens_per_second(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert!((config.tokens_per_second - 2.0).abs() < f64::EPSILON);
        assert!((config.bucket_capacity - 10.0).abs() < f64::EPSILON);
        assert!(config.burst_capacity >= config.bucket_capacity);
        assert!(config.min_tokens_per_second < config.max_tokens_per_second);
    }

    #[test]
    fn test_rate_limit_config_rejects_inverted_bounds() {
        let config = RateLimitConfig {
            min_tokens_per_second: 10.0,
            max_tokens_per_second: 1.0,
            ..RateLimitConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(RateLimitConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rate_limit_config_rejects_infinite_rate() {
        let config = RateLimitConfig {
            tokens_per_second: f64::INFINITY,
            ..RateLimitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_limit_config_deserialization_partial() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"tokens_per_second": 8.0, "bucket_capacity": 4.0}"#).unwrap();
        assert!((config.tokens_per_second - 8.0).abs() < f64::EPSILON);
        assert!((config.bucket_capacity - 4.0).abs() < f64::EPSILON);
        assert!((config.target_response_time - 5.0).abs() < f64::EPSILON);
    }
}
