//! Endpoint health, fallback caching, and dead-letter handling

pub mod dead_letter;
pub mod fallback;
pub mod framework;
pub mod health;

pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use fallback::{CallOutcome, FallbackCache};
pub use framework::{FrameworkStats, ResilienceFramework};
pub use health::{HealthMonitor, HealthState, HealthStatus};
