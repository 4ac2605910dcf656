//! Integrated facade over admission control, retry, and failure handling
//!
//! [`ResilienceSystem`] owns one [`SmartRateLimiter`], one
//! [`AdaptiveRetryManager`], and one [`ResilienceFramework`] and runs every
//! call through them in that order: admission first, then the breaker-gated
//! retry loop, then fallback substitution or dead-lettering once the retry
//! budget is spent.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{ChatCompletion, ChatCompletionRequest, ChatCompletionResponse, LlmError};
use crate::config::ResilienceConfig;
use crate::core::rate_limiter::{QueueStatus, RequestPriority, SmartRateLimiter};
use crate::core::resilience::{CallOutcome, FrameworkStats, ResilienceFramework};
use crate::core::retry::{AdaptiveRetryManager, RetryHealthMetrics};
use crate::monitoring::{CallMetricsSink, CallRecord, NullMetricsSink};
use crate::utils::error::{ErrorClass, ResilienceError};

/// Per-call knobs for [`ResilienceSystem::execute`]
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Endpoint the call targets; keys health, fallback, and dead letters
    pub endpoint: String,
    /// Admission priority tier
    pub priority: RequestPriority,
    /// Maximum seconds to wait for admission
    pub timeout: f64,
    /// Whether a cached response may substitute for a failed call
    pub enable_fallback: bool,
    /// Model label forwarded to metrics
    pub model: Option<String>,
    /// Caller-reported token usage forwarded to metrics
    pub expected_tokens: Option<u64>,
    /// Key identifying this request's arguments in the fallback cache
    pub args_key: String,
}

impl CallOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            priority: RequestPriority::default(),
            timeout: 30.0,
            enable_fallback: true,
            model: None,
            expected_tokens: None,
            args_key: "default".to_string(),
        }
    }

    pub fn priority(mut self, priority: RequestPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn enable_fallback(mut self, enable: bool) -> Self {
        self.enable_fallback = enable;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn expected_tokens(mut self, tokens: u64) -> Self {
        self.expected_tokens = Some(tokens);
        self
    }

    pub fn args_key(mut self, key: impl Into<String>) -> Self {
        self.args_key = key.into();
        self
    }
}

/// Combined status view across the three subsystems
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub retry: RetryHealthMetrics,
    pub rate_limiter: QueueStatus,
    pub framework: FrameworkStats,
}

/// Facade wiring the rate limiter, retry manager, and resilience framework
/// together; one instance per provider account is typical.
pub struct ResilienceSystem {
    retry: AdaptiveRetryManager,
    rate_limiter: SmartRateLimiter,
    framework: ResilienceFramework,
    metrics: Arc<dyn CallMetricsSink>,
}

impl ResilienceSystem {
    /// Build a system from configuration with the given metrics sink
    pub fn new(config: ResilienceConfig, metrics: Arc<dyn CallMetricsSink>) -> Self {
        Self {
            retry: AdaptiveRetryManager::new(config.retry),
            rate_limiter: SmartRateLimiter::new(config.rate_limit),
            framework: ResilienceFramework::new(&config.framework),
            metrics,
        }
    }

    /// Build a system that discards metrics
    pub fn with_defaults(config: ResilienceConfig) -> Self {
        Self::new(config, Arc::new(NullMetricsSink))
    }

    /// Launch the rate limiter's background task. Idempotent.
    pub fn start(&self) {
        self.rate_limiter.start();
    }

    /// Stop the background task
    pub fn stop(&self) {
        self.rate_limiter.stop();
    }

    /// Direct access to the retry manager
    pub fn retry_manager(&self) -> &AdaptiveRetryManager {
        &self.retry
    }

    /// Direct access to the rate limiter
    pub fn rate_limiter(&self) -> &SmartRateLimiter {
        &self.rate_limiter
    }

    /// Direct access to the resilience framework
    pub fn framework(&self) -> &ResilienceFramework {
        &self.framework
    }

    /// Run `f` under the full resilience pipeline.
    ///
    /// The call first waits for rate-limiter admission, failing with
    /// [`ResilienceError::AdmissionTimeout`] if the per-call timeout elapses.
    /// Admitted calls run under the retry policy; once the retry budget is
    /// spent (or the circuit rejects the call), a cached response is
    /// substituted as [`CallOutcome::Fallback`] when permitted, and otherwise
    /// the request is dead-lettered and the error returned.
    pub async fn execute<T, E, F, Fut>(
        &self,
        options: &CallOptions,
        f: F,
    ) -> Result<CallOutcome<T>, ResilienceError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: ErrorClass + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();

        if !self.rate_limiter.acquire(options.priority, options.timeout).await {
            let waited = started.elapsed().as_secs_f64();
            let err = ResilienceError::AdmissionTimeout {
                endpoint: options.endpoint.clone(),
                waited_secs: waited,
            };
            self.record(options, started, false, Some("admission_timeout"), false, 0)
                .await;
            return Err(err);
        }
        debug!(endpoint = %options.endpoint, priority = options.priority.as_str(), "call admitted");

        let attempts = AtomicU32::new(0);
        let mut f = f;
        let attempt_fn = || {
            attempts.fetch_add(1, Ordering::Relaxed);
            f()
        };

        let result = self
            .framework
            .execute_with_resilience(
                &options.endpoint,
                &options.args_key,
                options.enable_fallback,
                || self.retry.execute(&options.endpoint, attempt_fn),
            )
            .await;

        let duration = started.elapsed().as_secs_f64();
        let retries = attempts.load(Ordering::Relaxed).saturating_sub(1);
        let success = result.is_ok();
        self.rate_limiter
            .record_response(duration, success, options.priority);

        let (error_kind, cache_hit) = match &result {
            Ok(outcome) => (None, outcome.is_fallback()),
            Err(ResilienceError::CircuitOpen { .. }) => (Some("circuit_open"), false),
            Err(ResilienceError::AdmissionTimeout { .. }) => (Some("admission_timeout"), false),
            Err(ResilienceError::Call(e)) => (Some(e.error_kind().as_str()), false),
        };
        self.record(options, started, success, error_kind, cache_hit, retries)
            .await;

        result
    }

    /// Run a chat completion through the pipeline, keying the fallback cache
    /// by the serialized request
    pub async fn complete(
        &self,
        backend: &dyn ChatCompletion,
        request: &ChatCompletionRequest,
        options: &CallOptions,
    ) -> Result<CallOutcome<ChatCompletionResponse>, ResilienceError<LlmError>> {
        let args_key = serde_json::to_string(request)
            .unwrap_or_else(|_| format!("{}:{}", request.model, request.prompt));
        let options = options.clone().args_key(args_key);
        self.execute(&options, || backend.complete(request)).await
    }

    /// Combined status across all three subsystems
    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            retry: self.retry.health_metrics().await,
            rate_limiter: self.rate_limiter.queue_status(),
            framework: self.framework.stats(),
        }
    }

    async fn record(
        &self,
        options: &CallOptions,
        started: Instant,
        success: bool,
        error_kind: Option<&str>,
        cache_hit: bool,
        retries: u32,
    ) {
        self.metrics
            .record_call(CallRecord {
                endpoint: options.endpoint.clone(),
                duration: started.elapsed().as_secs_f64(),
                success,
                error_kind: error_kind.map(str::to_string),
                tokens_used: options.expected_tokens,
                model: options.model.clone(),
                cache_hit,
                priority: options.priority.as_str().to_string(),
                retries,
            })
            .await;
    }
}
