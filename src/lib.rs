//! # llm-resilience
//!
//! A resilience layer for LLM API calls: adaptive retries, self-tuning rate
//! limiting, circuit breaking, fallback caching, and dead-letter handling,
//! composed behind a single facade.
//!
//! ## Features
//!
//! - **Adaptive Retry**: Exponential, linear, fixed, or learned backoff with
//!   per-error-kind scaling and persisted failure history
//! - **Circuit Breaker**: Three-state breaker with half-open probing
//! - **Smart Rate Limiting**: Priority-aware token bucket whose refill rate
//!   tracks observed response times
//! - **Fallback Caching**: Failed calls can serve the last successful
//!   response, explicitly marked as stale
//! - **Dead Letters**: Exhausted requests are retained for inspection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_resilience::{CallOptions, ResilienceConfig, ResilienceSystem};
//! use llm_resilience::client::{ChatCompletion, ChatCompletionRequest};
//!
//! # async fn run(backend: &dyn ChatCompletion) -> Result<(), Box<dyn std::error::Error>> {
//! let system = ResilienceSystem::with_defaults(ResilienceConfig::default());
//! system.start();
//!
//! let request = ChatCompletionRequest {
//!     prompt: "Hello".into(),
//!     model: "gpt-4o".into(),
//!     temperature: None,
//!     max_tokens: None,
//!     system_prompt: None,
//! };
//! let options = CallOptions::new("chat").model("gpt-4o");
//! let outcome = system.complete(backend, &request, &options).await?;
//! if outcome.is_fallback() {
//!     println!("served a cached response");
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod client;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod utils;

// Re-export main types
pub use config::{ConfigError, FrameworkConfig, RateLimitConfig, ResilienceConfig, RetryConfig, RetryStrategy};
pub use core::rate_limiter::{QueueStatus, RequestPriority, SmartRateLimiter};
pub use core::resilience::{CallOutcome, DeadLetter, HealthState, HealthStatus, ResilienceFramework};
pub use core::retry::{AdaptiveRetryManager, CircuitBreaker, CircuitState, RetryHealthMetrics};
pub use core::{CallOptions, ResilienceSystem, SystemStatus};
pub use monitoring::{CallMetricsSink, CallRecord, NullMetricsSink, TracingMetricsSink};
pub use utils::error::{ErrorClass, ErrorKind, ResilienceError};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
