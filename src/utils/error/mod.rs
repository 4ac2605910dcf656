//! Error handling for the resilience layer
//!
//! The retry and circuit-breaker logic is driven entirely by the *kind* of
//! error a guarded call produced, while the error value itself must reach the
//! caller unmodified so it can still be pattern-matched upstream.

mod types;

pub use types::{ErrorClass, ErrorKind, ResilienceError};
