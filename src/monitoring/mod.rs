//! Call metrics reporting
//!
//! The system emits one [`CallRecord`] per completed call through a
//! [`CallMetricsSink`]. The default sink writes structured log events; embedders
//! can provide their own implementation to ship records elsewhere.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// One completed call through the resilience system
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    /// Endpoint the call targeted
    pub endpoint: String,
    /// Wall-clock duration in seconds, including retries and queueing
    pub duration: f64,
    /// Whether a value was ultimately produced
    pub success: bool,
    /// Classified error kind for failed calls
    pub error_kind: Option<String>,
    /// Tokens consumed, when the caller reported them
    pub tokens_used: Option<u64>,
    /// Model the call was routed to
    pub model: Option<String>,
    /// Whether the value came from the fallback cache
    pub cache_hit: bool,
    /// Priority tier the call was admitted under
    pub priority: String,
    /// Retries spent before the final attempt
    pub retries: u32,
}

/// Destination for per-call records
#[async_trait]
pub trait CallMetricsSink: Send + Sync {
    async fn record_call(&self, record: CallRecord);
}

/// Sink that emits each record as a structured log event
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

#[async_trait]
impl CallMetricsSink for TracingMetricsSink {
    async fn record_call(&self, record: CallRecord) {
        info!(
            endpoint = %record.endpoint,
            duration_secs = record.duration,
            success = record.success,
            error_kind = record.error_kind.as_deref().unwrap_or(""),
            cache_hit = record.cache_hit,
            priority = %record.priority,
            retries = record.retries,
            "call completed"
        );
    }
}

/// Sink that discards every record
#[derive(Debug, Default)]
pub struct NullMetricsSink;

#[async_trait]
impl CallMetricsSink for NullMetricsSink {
    async fn record_call(&self, _record: CallRecord) {}
}
