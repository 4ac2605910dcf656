//! Priority-aware, self-tuning rate limiting
//!
//! A token bucket gates admission; five priority tiers queue behind it, and
//! a background loop adjusts the refill rate from observed response times.

mod bucket;
mod limiter;
mod types;


pub use bucket::TokenBucket;
pub use limiter::SmartRateLimiter;
pub use types::{QueueStatus, RequestPriority};
