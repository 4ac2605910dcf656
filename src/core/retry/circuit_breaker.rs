//! Circuit breaker for outbound call protection

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the recovery timeout elapses
    Open,
    /// A limited probe cohort is allowed through to test recovery
    HalfOpen,
}

impl CircuitState {
    /// Stable string label for health reporting
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    last_success_time: Option<Instant>,
    total_requests: u64,
    total_failures: u64,
}

/// Read-only snapshot of the breaker, for health reporting
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Consecutive failures in the current window
    pub failure_count: u32,
    /// Successes recorded while half-open
    pub success_count: u32,
    /// Monotonic total of recorded outcomes
    pub total_requests: u64,
    /// Monotonic total of recorded failures
    pub total_failures: u64,
    /// Seconds since the most recent failure, if any
    pub last_failure_secs_ago: Option<f64>,
}

/// Three-state circuit breaker.
///
/// All transitions happen under one lock, so two tasks racing to record the
/// failure that crosses the threshold cannot both flip Closed to Open.
/// Counters follow the usual discipline: `failure_count` resets on the
/// transition to Closed, `success_count` is only meaningful while HalfOpen
/// and resets whenever the state leaves HalfOpen.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    success_threshold: u32,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state
    pub fn new(failure_threshold: u32, recovery_timeout: Duration, success_threshold: u32) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            success_threshold,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_time: None,
                last_success_time: None,
                total_requests: 0,
                total_failures: 0,
            }),
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// When Open and the recovery timeout has elapsed since the last failure,
    /// this transitions to HalfOpen (resetting the probe success count) and
    /// admits the call.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed_enough = inner
                    .last_failure_time
                    .is_some_and(|t| t.elapsed() >= self.recovery_timeout);
                if elapsed_enough {
                    debug!("circuit breaker transitioning open -> half_open");
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call; returns the state after the transition
    pub fn on_success(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.last_success_time = Some(Instant::now());
        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.success_threshold {
                debug!("circuit breaker transitioning half_open -> closed");
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.success_count = 0;
            }
        }
        inner.state
    }

    /// Record a failed call; returns the state after the transition
    pub fn on_failure(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.total_failures += 1;
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.failure_threshold {
                    warn!(
                        failures = inner.failure_count,
                        "circuit breaker opening after consecutive failures"
                    );
                    inner.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                debug!("circuit breaker transitioning half_open -> open on probe failure");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
            }
            CircuitState::Open => {}
        }
        inner.state
    }

    /// Current state, without side effects
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Total recorded outcomes
    pub fn total_requests(&self) -> u64 {
        self.inner.lock().total_requests
    }

    /// Read-only snapshot for health reporting
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock();
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_requests: inner.total_requests,
            total_failures: inner.total_failures,
            last_failure_secs_ago: inner.last_failure_time.map(|t| t.elapsed().as_secs_f64()),
        }
    }
}
