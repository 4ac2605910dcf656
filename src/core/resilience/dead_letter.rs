//! Bounded dead-letter queue for exhausted requests

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

/// A request that failed with no fallback available
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    /// Endpoint the request was for
    pub endpoint: String,
    /// Argument key identifying the request
    pub args_key: String,
    /// Final error message
    pub error: String,
    /// When the request was recorded
    pub recorded_at: DateTime<Utc>,
}

/// FIFO queue with a fixed capacity; the oldest entry is evicted when full
pub struct DeadLetterQueue {
    capacity: usize,
    entries: Mutex<VecDeque<DeadLetter>>,
}

impl DeadLetterQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a dead letter, evicting the oldest entry once at capacity
    pub fn record(&self, endpoint: &str, args_key: &str, error: &str) {
        warn!(endpoint = %endpoint, error = %error, "recording dead letter");
        let mut entries = self.entries.lock();
        if self.capacity == 0 {
            return;
        }
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(DeadLetter {
            endpoint: endpoint.to_string(),
            args_key: args_key.to_string(),
            error: error.to_string(),
            recorded_at: Utc::now(),
        });
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the queued entries, oldest first
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Remove and return all queued entries, oldest first
    pub fn drain(&self) -> Vec<DeadLetter> {
        self.entries.lock().drain(..).collect()
    }
}
