//! Error types for the resilience layer

use std::fmt;
use thiserror::Error;

/// Classification of a failed call, as seen by the retry logic.
///
/// Only `RateLimit`, `Connection`, and `Api` are transient-retryable;
/// everything else propagates on first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Provider rejected the call due to quota or request-rate limits
    RateLimit,
    /// Transport-level failure (DNS, TLS, reset connections)
    Connection,
    /// The attempt exceeded its deadline
    Timeout,
    /// Generic provider/API error (5xx-style)
    Api,
    /// Anything the caller did not classify as one of the above
    Other,
}

impl ErrorKind {
    /// Stable string label, used for metrics and the learned-history tables
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api",
            ErrorKind::Other => "other",
        }
    }

    /// Whether the retry loop may attempt this kind again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimit | ErrorKind::Connection | ErrorKind::Api
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a caller error type onto the retry taxonomy.
///
/// Implemented by whatever error type the guarded call returns; the crate
/// ships an implementation for [`crate::client::LlmError`].
pub trait ErrorClass {
    /// The retry kind this error belongs to
    fn error_kind(&self) -> ErrorKind;
}

/// Error surfaced by the resilience layer around a guarded call.
///
/// `Call` carries the caller's original error value untouched. The two
/// rejection variants are raised by this layer itself, before (admission) or
/// instead of (open circuit) invoking the guarded function, and must not be
/// confused with a downstream failure.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The circuit breaker is open for this endpoint; the call was never made
    #[error("circuit breaker open for endpoint '{endpoint}'")]
    CircuitOpen {
        /// Endpoint the rejected call was bound for
        endpoint: String,
    },

    /// The rate limiter did not admit the call within its timeout
    #[error("rate limiter admission timed out for endpoint '{endpoint}' after {waited_secs:.2}s")]
    AdmissionTimeout {
        /// Endpoint the rejected call was bound for
        endpoint: String,
        /// How long the caller waited before giving up
        waited_secs: f64,
    },

    /// The guarded call failed; this is the original error, not a wrapper
    #[error("{0}")]
    Call(E),
}

impl<E> ResilienceError<E> {
    /// Extract the original call error, if this is one
    pub fn into_call_error(self) -> Option<E> {
        match self {
            ResilienceError::Call(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this is a rejection raised by the layer itself
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. } | ResilienceError::AdmissionTimeout { .. }
        )
    }
}
