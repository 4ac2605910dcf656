//! Adaptive retry manager
//!
//! Decides retry/no-retry, computes backoff delays, and maintains the
//! circuit breaker. Failure timing is accumulated per error kind and
//! persisted through [`HistoryStore`] so the adaptive strategy warm-starts
//! across restarts.

use super::circuit_breaker::{CircuitBreaker, CircuitState};
use super::history::{HistoryStore, RetryHistorySnapshot};
use crate::config::{RetryConfig, RetryStrategy};
use crate::utils::error::{ErrorClass, ErrorKind, ResilienceError};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Most recent inter-failure gaps retained per error kind
const GAP_HISTORY_CAP: usize = 50;

/// Rolling window for the request-metrics history
const METRICS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Window for the "recent" success rate in health reporting
const RECENT_WINDOW: Duration = Duration::from_secs(10 * 60);

/// One completed call attempt
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    /// When the attempt completed
    pub at: Instant,
    /// Attempt duration in seconds (0.0 for failure recordings)
    pub duration: f64,
    /// Whether the attempt succeeded
    pub success: bool,
    /// Error kind for failed attempts
    pub error_kind: Option<ErrorKind>,
    /// Retries that preceded a successful attempt
    pub retry_count: u32,
    /// Endpoint the attempt was bound for
    pub endpoint: String,
}

struct LearnedState {
    metrics: VecDeque<RequestMetrics>,
    error_patterns: HashMap<String, Vec<f64>>,
    adaptive_delays: HashMap<String, f64>,
    last_failure_at: HashMap<String, Instant>,
}

/// Health view over the retry manager, pure read
#[derive(Debug, Clone, Serialize)]
pub struct RetryHealthMetrics {
    /// Circuit state label: "closed", "open", or "half_open"
    pub circuit_state: String,
    /// Success rate over the whole metrics window
    pub success_rate: f64,
    /// Success rate over the last ten minutes
    pub recent_success_rate: f64,
    /// Consecutive failures in the breaker's current window
    pub failure_count: u32,
    /// Total outcomes recorded by the breaker
    pub total_requests: u64,
    /// Seconds since the most recent failure, if any
    pub last_failure_secs_ago: Option<f64>,
    /// Error kinds with accumulated gap history
    pub tracked_error_kinds: usize,
    /// Error kinds with a learned base delay
    pub learned_delays: usize,
}

/// Retry policy object: per-strategy delays, transient-error gating, and a
/// circuit breaker, with learned history behind it.
pub struct AdaptiveRetryManager {
    config: RetryConfig,
    breaker: CircuitBreaker,
    state: Mutex<LearnedState>,
    store: HistoryStore,
}

impl AdaptiveRetryManager {
    /// Create a manager, warm-starting the learned tables from the snapshot
    /// file if it exists
    pub fn new(config: RetryConfig) -> Self {
        let store = HistoryStore::new(config.snapshot_path.clone());
        let snapshot = store.load();
        // from_secs_f64 panics on negative or non-finite input
        let recovery = config.recovery_timeout.max(0.0).min(u32::MAX as f64);
        let breaker = CircuitBreaker::new(
            config.failure_threshold,
            Duration::from_secs_f64(recovery),
            config.success_threshold,
        );
        Self {
            breaker,
            state: Mutex::new(LearnedState {
                metrics: VecDeque::new(),
                error_patterns: snapshot.error_patterns,
                adaptive_delays: snapshot.adaptive_delays,
                last_failure_at: HashMap::new(),
            }),
            store,
            config,
        }
    }

    /// Current circuit state
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Whether the breaker admits a call right now; an open circuit whose
    /// recovery timeout has elapsed transitions to half-open here
    pub fn circuit_allows(&self) -> bool {
        self.breaker.try_acquire()
    }

    /// Whether the attempt with the given index may run.
    ///
    /// An open breaker rejects everything until its recovery timeout has
    /// elapsed, at which point the next caller is admitted as a half-open
    /// probe. Past the attempt budget, or for non-transient kinds, the
    /// answer is always no.
    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> bool {
        if self.breaker.state() == CircuitState::Open {
            return self.breaker.try_acquire();
        }
        if attempt > self.config.max_retries {
            return false;
        }
        kind.is_transient()
    }

    /// Delay in seconds before the given attempt, per the configured
    /// strategy, scaled by the error-kind multiplier, jittered ±10% when
    /// enabled, and clamped to [0.1, max_delay].
    pub async fn retry_delay(&self, kind: ErrorKind, attempt: u32) -> f64 {
        let base = match self.config.strategy {
            RetryStrategy::ExponentialBackoff => {
                self.config.base_delay * self.config.exponential_base.powi(attempt as i32)
            }
            RetryStrategy::LinearBackoff => self.config.base_delay * (attempt as f64 + 1.0),
            RetryStrategy::FixedDelay => self.config.base_delay,
            RetryStrategy::Adaptive => {
                let state = self.state.lock().await;
                let learned = state
                    .adaptive_delays
                    .get(kind.as_str())
                    .copied()
                    .unwrap_or(self.config.base_delay);
                let blended = match state.error_patterns.get(kind.as_str()).and_then(|g| median(g))
                {
                    Some(gap_median) => (learned + gap_median) / 2.0,
                    None => learned,
                };
                blended * self.config.exponential_base.powi(attempt as i32)
            }
        };

        let multiplier = match kind {
            ErrorKind::RateLimit => self.config.rate_limit_multiplier,
            ErrorKind::Connection => self.config.connection_multiplier,
            ErrorKind::Api => self.config.api_multiplier,
            _ => 1.0,
        };

        let mut delay = base * multiplier;
        if self.config.jitter {
            delay *= 0.9 + rand::random::<f64>() * 0.2;
        }
        delay.max(0.1).min(self.config.max_delay)
    }

    /// Record a successful call: feeds the breaker, appends to the metrics
    /// history, prunes entries outside the 24 h window, and persists the
    /// learned tables every `snapshot_every` total requests.
    pub async fn record_success(&self, duration: f64, endpoint: &str, retries: u32) {
        self.breaker.on_success();
        let total = self.breaker.total_requests();

        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.metrics.push_back(RequestMetrics {
            at: now,
            duration,
            success: true,
            error_kind: None,
            retry_count: retries,
            endpoint: endpoint.to_string(),
        });
        while state
            .metrics
            .front()
            .is_some_and(|m| now.duration_since(m.at) > METRICS_WINDOW)
        {
            state.metrics.pop_front();
        }

        if self.config.snapshot_every > 0 && total % self.config.snapshot_every == 0 {
            self.store.save(&RetryHistorySnapshot {
                error_patterns: state.error_patterns.clone(),
                adaptive_delays: state.adaptive_delays.clone(),
                last_updated: None,
            });
        }
    }

    /// Record a failed call: feeds the breaker and updates the per-kind
    /// inter-failure gap history (capped at the 50 most recent) plus the
    /// learned base delay.
    pub async fn record_failure(&self, kind: ErrorKind, endpoint: &str) {
        self.breaker.on_failure();

        let mut state = self.state.lock().await;
        let now = Instant::now();
        let key = kind.as_str().to_string();

        if let Some(prev) = state.last_failure_at.get(&key).copied() {
            let gap = now.duration_since(prev).as_secs_f64();
            let gaps = state.error_patterns.entry(key.clone()).or_default();
            gaps.push(gap);
            if gaps.len() > GAP_HISTORY_CAP {
                let excess = gaps.len() - GAP_HISTORY_CAP;
                gaps.drain(..excess);
            }
            // exponential moving average; the exact smoothing is not
            // load-bearing as long as backoff stays monotonic per attempt
            let learned = state
                .adaptive_delays
                .entry(key.clone())
                .or_insert(self.config.base_delay);
            *learned = *learned * 0.9 + gap.min(self.config.max_delay) * 0.1;
        }
        state.last_failure_at.insert(key, now);

        state.metrics.push_back(RequestMetrics {
            at: now,
            duration: 0.0,
            success: false,
            error_kind: Some(kind),
            retry_count: 0,
            endpoint: endpoint.to_string(),
        });
    }

    /// Health view: circuit state, aggregate and last-10-minute success
    /// rates, and learned-table sizes. No side effects.
    pub async fn health_metrics(&self) -> RetryHealthMetrics {
        let breaker = self.breaker.snapshot();
        let state = self.state.lock().await;

        let total = state.metrics.len();
        let successes = state.metrics.iter().filter(|m| m.success).count();
        let success_rate = if total > 0 {
            successes as f64 / total as f64
        } else {
            1.0
        };

        let now = Instant::now();
        let recent: Vec<_> = state
            .metrics
            .iter()
            .filter(|m| now.duration_since(m.at) <= RECENT_WINDOW)
            .collect();
        let recent_success_rate = if recent.is_empty() {
            1.0
        } else {
            recent.iter().filter(|m| m.success).count() as f64 / recent.len() as f64
        };

        RetryHealthMetrics {
            circuit_state: breaker.state.as_str().to_string(),
            success_rate,
            recent_success_rate,
            failure_count: breaker.failure_count,
            total_requests: breaker.total_requests,
            last_failure_secs_ago: breaker.last_failure_secs_ago,
            tracked_error_kinds: state.error_patterns.len(),
            learned_delays: state.adaptive_delays.len(),
        }
    }

    /// Run a call under this retry policy.
    ///
    /// Attempts run until success, a non-retryable error, an exhausted
    /// attempt budget, or an open circuit. On exhaustion the original error
    /// propagates unchanged inside [`ResilienceError::Call`].
    pub async fn execute<T, E, F, Fut>(
        &self,
        endpoint: &str,
        mut f: F,
    ) -> Result<T, ResilienceError<E>>
    where
        E: ErrorClass + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if !self.breaker.try_acquire() {
                return Err(ResilienceError::CircuitOpen {
                    endpoint: endpoint.to_string(),
                });
            }

            let started = Instant::now();
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(endpoint, attempt, "call succeeded after retries");
                    }
                    self.record_success(started.elapsed().as_secs_f64(), endpoint, attempt)
                        .await;
                    return Ok(value);
                }
                Err(e) => {
                    let kind = e.error_kind();
                    self.record_failure(kind, endpoint).await;
                    warn!(endpoint, attempt, kind = %kind, error = %e, "call attempt failed");
                    if !self.should_retry(kind, attempt + 1) {
                        return Err(ResilienceError::Call(e));
                    }
                    let delay = self.retry_delay(kind, attempt).await;
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
