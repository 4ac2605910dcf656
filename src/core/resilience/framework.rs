//! Failure-handling wrapper around a single call attempt
//!
//! The framework sequences health recording, fallback substitution, and
//! dead-lettering around one invocation of the underlying operation. Retry
//! scheduling and admission control live elsewhere; this layer only decides
//! what happens to a result once the attempt has run.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::FrameworkConfig;
use crate::core::resilience::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::core::resilience::fallback::{CallOutcome, FallbackCache};
use crate::core::resilience::health::{HealthMonitor, HealthStatus};

/// Aggregate counters reported by [`ResilienceFramework::stats`]
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkStats {
    /// Endpoints with recorded traffic
    pub tracked_endpoints: usize,
    /// Live fallback cache entries
    pub cached_responses: u64,
    /// Requests sitting in the dead-letter queue
    pub dead_letters: usize,
}

/// Health, fallback, and dead-letter handling for one attempt at a time
pub struct ResilienceFramework {
    health: HealthMonitor,
    fallback: FallbackCache,
    dead_letters: DeadLetterQueue,
}

impl ResilienceFramework {
    pub fn new(config: &FrameworkConfig) -> Self {
        Self {
            health: HealthMonitor::new(
                config.degraded_threshold,
                config.unhealthy_threshold,
            ),
            fallback: FallbackCache::new(config.max_cache_entries, config.fallback_ttl),
            dead_letters: DeadLetterQueue::new(config.dead_letter_capacity),
        }
    }

    /// Run one attempt of `operation` with the full failure-handling chain.
    ///
    /// On success the response is cached for future fallback and returned as
    /// [`CallOutcome::Fresh`]. On failure, a cached response is substituted as
    /// [`CallOutcome::Fallback`] when `enable_fallback` is set and one exists;
    /// otherwise the request is dead-lettered and the error propagated
    /// unchanged.
    pub async fn execute_with_resilience<T, E, F, Fut>(
        &self,
        endpoint: &str,
        args_key: &str,
        enable_fallback: bool,
        operation: F,
    ) -> Result<CallOutcome<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        match operation().await {
            Ok(value) => {
                self.health
                    .record_request(endpoint, true, started.elapsed().as_secs_f64());
                self.fallback.store(endpoint, args_key, &value).await;
                Ok(CallOutcome::Fresh(value))
            }
            Err(err) => {
                self.health
                    .record_request(endpoint, false, started.elapsed().as_secs_f64());
                if enable_fallback {
                    if let Some((value, age)) = self.fallback.lookup(endpoint, args_key).await {
                        info!(
                            endpoint = %endpoint,
                            age_secs = age.as_secs_f64(),
                            error = %err,
                            "call failed, substituting cached response"
                        );
                        return Ok(CallOutcome::Fallback { value, age });
                    }
                    debug!(endpoint = %endpoint, "no cached response available for fallback");
                }
                self.dead_letters.record(endpoint, args_key, &err.to_string());
                Err(err)
            }
        }
    }

    /// Health of one endpoint, if any traffic was recorded
    pub fn health_status(&self, endpoint: &str) -> Option<HealthStatus> {
        self.health.health_status(endpoint)
    }

    /// Snapshot of the dead-letter queue
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.entries()
    }

    /// Drain the dead-letter queue for reprocessing
    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.drain()
    }

    /// Aggregate counters across the framework
    pub fn stats(&self) -> FrameworkStats {
        FrameworkStats {
            tracked_endpoints: self.health.endpoint_count(),
            cached_responses: self.fallback.entry_count(),
            dead_letters: self.dead_letters.len(),
        }
    }
}
