//! Default values for configuration fields

use std::path::PathBuf;

pub(super) fn default_true() -> bool {
    true
}

// Retry defaults

pub(super) fn default_max_retries() -> u32 {
    3
}

pub(super) fn default_base_delay() -> f64 {
    1.0
}

pub(super) fn default_max_delay() -> f64 {
    60.0
}

pub(super) fn default_exponential_base() -> f64 {
    2.0
}

pub(super) fn default_failure_threshold() -> u32 {
    5
}

pub(super) fn default_recovery_timeout() -> f64 {
    60.0
}

pub(super) fn default_success_threshold() -> u32 {
    3
}

pub(super) fn default_rate_limit_multiplier() -> f64 {
    2.0
}

pub(super) fn default_connection_multiplier() -> f64 {
    1.5
}

pub(super) fn default_api_multiplier() -> f64 {
    1.2
}

pub(super) fn default_snapshot_path() -> PathBuf {
    PathBuf::from("cache/retry_history.json")
}

pub(super) fn default_snapshot_every() -> u64 {
    100
}

// Rate limiter defaults

pub(super) fn default_tokens_per_second() -> f64 {
    2.0
}

pub(super) fn default_bucket_capacity() -> f64 {
    10.0
}

pub(super) fn default_burst_capacity() -> f64 {
    15.0
}

pub(super) fn default_target_response_time() -> f64 {
    5.0
}

pub(super) fn default_adjustment_interval() -> f64 {
    10.0
}

pub(super) fn default_adjustment_factor() -> f64 {
    0.25
}

pub(super) fn default_min_tokens_per_second() -> f64 {
    0.1
}

pub(super) fn default_max_tokens_per_second() -> f64 {
    50.0
}

// Framework defaults

pub(super) fn default_fallback_ttl() -> f64 {
    300.0
}

pub(super) fn default_max_cache_entries() -> u64 {
    1_000
}

pub(super) fn default_degraded_threshold() -> f64 {
    0.9
}

pub(super) fn default_unhealthy_threshold() -> f64 {
    0.5
}

pub(super) fn default_dead_letter_capacity() -> usize {
    1_000
}
