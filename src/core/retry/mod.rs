//! Adaptive retry with circuit breaking
//!
//! [`AdaptiveRetryManager`] is the policy object; [`CircuitBreaker`] and
//! [`HistoryStore`] are its moving parts, usable on their own.

mod circuit_breaker;
mod history;
mod manager;

#[cfg(test)]
mod tests;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use history::{HistoryStore, RetryHistorySnapshot};
pub use manager::{AdaptiveRetryManager, RequestMetrics, RetryHealthMetrics};
