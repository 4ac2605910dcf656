//! Token bucket

use std::time::Instant;

/// Continuously-refilled token bucket.
///
/// Holds a float token count bounded by `capacity`; elapsed time × the
/// current rate is credited on every operation. Refunds of abandoned grants
/// may briefly push the count up to `burst` instead of `capacity`.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(rate: f64, capacity: f64, burst: f64) -> Self {
        Self {
            rate,
            capacity,
            burst: burst.max(capacity),
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if self.tokens < self.capacity {
            self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        }
        self.last_refill = now;
    }

    /// Non-blocking attempt to withdraw one token
    pub fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Return a granted token that was never used
    pub fn refund(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.burst);
    }

    /// Tokens currently available
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    /// Current refill rate in tokens per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Change the refill rate; takes effect from now on
    pub fn set_rate(&mut self, rate: f64) {
        self.refill();
        self.rate = rate;
    }

    #[cfg(test)]
    pub(crate) fn drain(&mut self) {
        self.refill();
        self.tokens = 0.0;
    }

    #[cfg(test)]
    pub(crate) fn credit(&mut self, tokens: f64) {
        self.tokens = (self.tokens + tokens).min(self.burst);
        // pin the refill clock so a zero-rate bucket stays deterministic
        self.last_refill = Instant::now();
    }
}
