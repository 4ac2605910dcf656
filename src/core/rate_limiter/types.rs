//! Rate limiter types

use super::limiter::TokenGrant;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::oneshot;

/// Admission priority; lower ordinal is served first when tokens are scarce.
///
/// Ordering is advisory for queue service only — it never preempts a call
/// that already holds a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    /// Interactive calls that must not wait behind anything else
    Critical,
    /// Latency-sensitive foreground work
    High,
    /// The default tier
    Normal,
    /// Deferred work
    Low,
    /// Bulk/offline work, served only when nothing else is queued
    Background,
}

impl RequestPriority {
    /// All tiers in service order
    pub const ALL: [RequestPriority; 5] = [
        RequestPriority::Critical,
        RequestPriority::High,
        RequestPriority::Normal,
        RequestPriority::Low,
        RequestPriority::Background,
    ];

    /// Queue index for this tier
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable string label for metrics
    pub fn as_str(self) -> &'static str {
        match self {
            RequestPriority::Critical => "critical",
            RequestPriority::High => "high",
            RequestPriority::Normal => "normal",
            RequestPriority::Low => "low",
            RequestPriority::Background => "background",
        }
    }
}

impl Default for RequestPriority {
    fn default() -> Self {
        RequestPriority::Normal
    }
}

/// A queued admission request
pub(super) struct Waiter {
    pub(super) id: u64,
    pub(super) enqueued_at: Instant,
    pub(super) tx: oneshot::Sender<TokenGrant>,
}

/// One observed call outcome, feeding the rate-adjustment loop
#[derive(Debug, Clone, Copy)]
pub(super) struct ResponseSample {
    pub(super) at: Instant,
    pub(super) duration: f64,
    pub(super) success: bool,
}

/// Read-only view of the limiter, for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    /// Queue depth per tier, in service order (critical first)
    pub queued: [usize; 5],
    /// Current refill rate
    pub tokens_per_second: f64,
    /// Tokens available right now
    pub available_tokens: f64,
}

impl QueueStatus {
    /// Total waiters across all tiers
    pub fn total_queued(&self) -> usize {
        self.queued.iter().sum()
    }
}
