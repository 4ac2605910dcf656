//! Core resilience subsystems

pub mod rate_limiter;
pub mod resilience;
pub mod retry;
pub mod system;

pub use system::{CallOptions, ResilienceSystem, SystemStatus};
