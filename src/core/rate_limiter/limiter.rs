//! Self-tuning, priority-aware admission control

use super::bucket::TokenBucket;
use super::types::{QueueStatus, RequestPriority, ResponseSample, Waiter};
use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// How often the background task dispatches queued waiters
const DISPATCH_TICK: Duration = Duration::from_millis(50);

/// Response samples older than this never influence the control loop
const SAMPLE_WINDOW: Duration = Duration::from_secs(60);

/// Hard cap on retained response samples
const SAMPLE_CAP: usize = 1024;

struct Inner {
    bucket: TokenBucket,
    queues: [VecDeque<Waiter>; 5],
    samples: VecDeque<ResponseSample>,
    next_waiter_id: u64,
}

/// A token handed to a queued waiter.
///
/// The grant refunds its token on drop unless [`disarm`](Self::disarm) was
/// called, so a waiter that is dropped after the dispatcher sent its grant
/// but before it was polled cannot leak the token.
pub(super) struct TokenGrant {
    inner: Option<Arc<Mutex<Inner>>>,
}

impl TokenGrant {
    fn new(inner: Arc<Mutex<Inner>>) -> Self {
        Self { inner: Some(inner) }
    }

    /// Mark the token as spent; drop becomes a no-op
    pub(super) fn disarm(&mut self) {
        self.inner = None;
    }
}

impl Drop for TokenGrant {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.lock().bucket.refund();
        }
    }
}

/// Token-bucket admission gate with strict priority tiers and a control loop
/// that nudges the refill rate toward a target response time.
///
/// Admission order under contention is strict priority across tiers and FIFO
/// within a tier. Waiters that time out or are cancelled are removed from
/// their queue; a token granted to an abandoned waiter is refunded.
pub struct SmartRateLimiter {
    config: RateLimitConfig,
    inner: Arc<Mutex<Inner>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SmartRateLimiter {
    /// Create a limiter; call [`start`](Self::start) to run the background
    /// dispatch/adjustment task
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = TokenBucket::new(
            config.tokens_per_second,
            config.bucket_capacity,
            config.burst_capacity,
        );
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                bucket,
                queues: Default::default(),
                samples: VecDeque::new(),
                next_waiter_id: 0,
            })),
            task: Mutex::new(None),
        }
    }

    /// Launch the background task. Idempotent.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();
        *task = Some(tokio::spawn(async move {
            let mut last_adjust = Instant::now();
            loop {
                tokio::time::sleep(DISPATCH_TICK).await;
                Self::dispatch_inner(&inner);
                if last_adjust.elapsed().as_secs_f64() >= config.adjustment_interval {
                    Self::adjust_rate_inner(&inner, &config);
                    last_adjust = Instant::now();
                }
            }
        }));
    }

    /// Cancel the background task
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Wait for admission.
    ///
    /// Returns `true` once a token has been consumed on the caller's behalf,
    /// `false` if `timeout` (seconds) elapsed first. A non-positive timeout
    /// fails fast when no token is immediately available. A `false` return is
    /// backpressure, not an error to retry in a loop.
    pub async fn acquire(&self, priority: RequestPriority, timeout: f64) -> bool {
        let (id, mut rx) = {
            let mut inner = self.inner.lock();
            let nothing_queued = inner.queues.iter().all(|q| q.is_empty());
            if nothing_queued && inner.bucket.try_acquire() {
                return true;
            }
            if timeout <= 0.0 {
                return false;
            }
            let id = inner.next_waiter_id;
            inner.next_waiter_id += 1;
            let (tx, rx) = oneshot::channel();
            inner.queues[priority.index()].push_back(Waiter {
                id,
                enqueued_at: Instant::now(),
                tx,
            });
            (id, rx)
        };

        let sleep = tokio::time::sleep(Duration::from_secs_f64(timeout));
        tokio::pin!(sleep);
        tokio::select! {
            granted = &mut rx => match granted {
                Ok(mut grant) => {
                    grant.disarm();
                    true
                }
                Err(_) => false,
            },
            _ = &mut sleep => {
                let removed = {
                    let mut inner = self.inner.lock();
                    let queue = &mut inner.queues[priority.index()];
                    match queue.iter().position(|w| w.id == id) {
                        Some(pos) => {
                            queue.remove(pos);
                            true
                        }
                        None => false,
                    }
                };
                if !removed {
                    // a grant that raced the timeout refunds itself on drop
                    drop(rx.try_recv());
                }
                trace!(priority = priority.as_str(), "admission wait abandoned");
                false
            }
        }
    }

    /// Feed an observed call outcome into the control loop's sample window
    pub fn record_response(&self, duration: f64, success: bool, _priority: RequestPriority) {
        let mut inner = self.inner.lock();
        inner.samples.push_back(ResponseSample {
            at: Instant::now(),
            duration,
            success,
        });
        while inner.samples.len() > SAMPLE_CAP {
            inner.samples.pop_front();
        }
    }

    /// Advisory estimate of how long a new request at this priority would
    /// wait, in seconds
    pub fn estimated_wait(&self, priority: RequestPriority) -> f64 {
        let mut inner = self.inner.lock();
        let ahead: usize = inner.queues[..=priority.index()]
            .iter()
            .map(|q| q.len())
            .sum();
        let available = inner.bucket.available();
        let rate = inner.bucket.rate();
        let deficit = ahead as f64 - available;
        if deficit <= 0.0 {
            0.0
        } else if rate <= 0.0 {
            f64::INFINITY
        } else {
            deficit / rate
        }
    }

    /// Read-only snapshot of queue depths and the current rate
    pub fn queue_status(&self) -> QueueStatus {
        let mut inner = self.inner.lock();
        let queued = [
            inner.queues[0].len(),
            inner.queues[1].len(),
            inner.queues[2].len(),
            inner.queues[3].len(),
            inner.queues[4].len(),
        ];
        QueueStatus {
            queued,
            tokens_per_second: inner.bucket.rate(),
            available_tokens: inner.bucket.available(),
        }
    }

    fn dispatch_inner(inner_arc: &Arc<Mutex<Inner>>) {
        let mut inner = inner_arc.lock();
        loop {
            // drop cancelled waiters before spending tokens on them
            for queue in inner.queues.iter_mut() {
                while queue.front().is_some_and(|w| w.tx.is_closed()) {
                    queue.pop_front();
                }
            }
            let Some(tier) = inner.queues.iter().position(|q| !q.is_empty()) else {
                break;
            };
            if !inner.bucket.try_acquire() {
                break;
            }
            let Some(waiter) = inner.queues[tier].pop_front() else {
                inner.bucket.refund();
                break;
            };
            // a grant dropped while this lock is held would deadlock in its
            // Drop impl, so the rejected-send path disarms before refunding
            match waiter.tx.send(TokenGrant::new(Arc::clone(inner_arc))) {
                Ok(()) => {
                    trace!(
                        waiter = waiter.id,
                        waited = ?waiter.enqueued_at.elapsed(),
                        "admitting queued request"
                    );
                }
                Err(mut grant) => {
                    grant.disarm();
                    inner.bucket.refund();
                }
            }
        }
    }

    fn adjust_rate_inner(inner: &Mutex<Inner>, config: &RateLimitConfig) {
        let mut inner = inner.lock();
        let now = Instant::now();
        while inner
            .samples
            .front()
            .is_some_and(|s| now.duration_since(s.at) > SAMPLE_WINDOW)
        {
            inner.samples.pop_front();
        }
        let window = Duration::from_secs_f64(config.adjustment_interval);
        let recent: Vec<ResponseSample> = inner
            .samples
            .iter()
            .filter(|s| now.duration_since(s.at) <= window)
            .copied()
            .collect();
        if recent.is_empty() {
            return;
        }

        let avg = recent.iter().map(|s| s.duration).sum::<f64>() / recent.len() as f64;
        let failure_ratio =
            recent.iter().filter(|s| !s.success).count() as f64 / recent.len() as f64;
        let rate = inner.bucket.rate();

        // additive increase, multiplicative decrease around the setpoint
        let new_rate = if failure_ratio > 0.2 || avg > config.target_response_time {
            (rate * (1.0 - config.adjustment_factor)).max(config.min_tokens_per_second)
        } else if avg < config.target_response_time * 0.7 {
            (rate + config.adjustment_factor).min(config.max_tokens_per_second)
        } else {
            rate
        };

        if (new_rate - rate).abs() > f64::EPSILON {
            debug!(
                old_rate = rate,
                new_rate,
                avg_response = avg,
                failure_ratio,
                "rate limiter adjusted refill rate"
            );
            inner.bucket.set_rate(new_rate);
        }
    }

    #[cfg(test)]
    pub(super) fn dispatch_now(&self) {
        Self::dispatch_inner(&self.inner);
    }

    #[cfg(test)]
    pub(super) fn adjust_now(&self) {
        Self::adjust_rate_inner(&self.inner, &self.config);
    }

    #[cfg(test)]
    pub(super) fn drain_tokens(&self) {
        self.inner.lock().bucket.drain();
    }

    #[cfg(test)]
    pub(super) fn credit_tokens(&self, tokens: f64) {
        self.inner.lock().bucket.credit(tokens);
    }

    #[cfg(test)]
    pub(super) fn current_rate(&self) -> f64 {
        self.inner.lock().bucket.rate()
    }
}

impl Drop for SmartRateLimiter {
    fn drop(&mut self) {
        self.stop();
    }
}
