//! Per-endpoint health tracking
//!
//! Classification is informational only: it feeds status reporting and never
//! blocks a call (admission control is the rate limiter's job).

use dashmap::DashMap;
use serde::Serialize;

/// Health bucket for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Success rate at or above the degraded threshold
    Healthy,
    /// Success rate between the unhealthy and degraded thresholds
    Degraded,
    /// Success rate below the unhealthy threshold
    Unhealthy,
}

#[derive(Debug, Default)]
struct EndpointRecord {
    total: u64,
    failures: u64,
    total_duration: f64,
}

/// Reported health of one endpoint
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Total requests recorded
    pub total_requests: u64,
    /// Fraction of requests that succeeded
    pub success_rate: f64,
    /// Mean observed duration in seconds
    pub avg_duration: f64,
    /// Classified bucket
    pub state: HealthState,
}

/// Lock-free-map-backed health monitor; recording is an atomic
/// read-modify-write on the endpoint's entry.
pub struct HealthMonitor {
    degraded_threshold: f64,
    unhealthy_threshold: f64,
    endpoints: DashMap<String, EndpointRecord>,
}

impl HealthMonitor {
    /// Create a monitor with the two classification thresholds
    pub fn new(degraded_threshold: f64, unhealthy_threshold: f64) -> Self {
        Self {
            degraded_threshold,
            unhealthy_threshold,
            endpoints: DashMap::new(),
        }
    }

    /// Record one completed request against an endpoint
    pub fn record_request(&self, endpoint: &str, success: bool, duration: f64) {
        let mut record = self.endpoints.entry(endpoint.to_string()).or_default();
        record.total += 1;
        if !success {
            record.failures += 1;
        }
        record.total_duration += duration;
    }

    /// Health of one endpoint, or `None` if nothing was recorded yet
    pub fn health_status(&self, endpoint: &str) -> Option<HealthStatus> {
        let record = self.endpoints.get(endpoint)?;
        let success_rate = if record.total > 0 {
            (record.total - record.failures) as f64 / record.total as f64
        } else {
            1.0
        };
        let state = if success_rate < self.unhealthy_threshold {
            HealthState::Unhealthy
        } else if success_rate < self.degraded_threshold {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };
        Some(HealthStatus {
            total_requests: record.total,
            success_rate,
            avg_duration: if record.total > 0 {
                record.total_duration / record.total as f64
            } else {
                0.0
            },
            state,
        })
    }

    /// Number of endpoints seen so far
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}
