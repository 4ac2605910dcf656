//! Tests for the retry manager

use super::*;
use crate::config::{RetryConfig, RetryStrategy};
use crate::utils::error::{ErrorClass, ErrorKind, ResilienceError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
enum TestError {
    #[error("rate limited")]
    RateLimit,
    #[error("connection refused")]
    Connection,
    #[error("invalid request")]
    Fatal,
}

impl ErrorClass for TestError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            TestError::RateLimit => ErrorKind::RateLimit,
            TestError::Connection => ErrorKind::Connection,
            TestError::Fatal => ErrorKind::Other,
        }
    }
}

fn test_config() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        base_delay: 0.001,
        max_delay: 1.0,
        jitter: false,
        failure_threshold: 100,
        recovery_timeout: 0.05,
        success_threshold: 2,
        snapshot_every: 0,
        ..RetryConfig::default()
    }
}

// ==================== Delay Computation Tests ====================

#[tokio::test]
async fn test_exponential_backoff_is_monotonic() {
    let config = RetryConfig {
        base_delay: 1.0,
        max_delay: 600.0,
        jitter: false,
        strategy: RetryStrategy::ExponentialBackoff,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let mut prev = 0.0;
    for attempt in 0..6 {
        let delay = manager.retry_delay(ErrorKind::Api, attempt).await;
        assert!(delay >= prev, "attempt {attempt}: {delay} < {prev}");
        prev = delay;
    }
}

#[tokio::test]
async fn test_linear_backoff_is_monotonic() {
    let config = RetryConfig {
        base_delay: 0.5,
        max_delay: 600.0,
        jitter: false,
        strategy: RetryStrategy::LinearBackoff,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let mut prev = 0.0;
    for attempt in 0..6 {
        let delay = manager.retry_delay(ErrorKind::Connection, attempt).await;
        assert!(delay >= prev);
        prev = delay;
    }
}

#[tokio::test]
async fn test_fixed_delay_ignores_attempt() {
    let config = RetryConfig {
        base_delay: 0.5,
        jitter: false,
        strategy: RetryStrategy::FixedDelay,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let d0 = manager.retry_delay(ErrorKind::Api, 0).await;
    let d5 = manager.retry_delay(ErrorKind::Api, 5).await;
    assert!((d0 - d5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_delay_clamped_to_max() {
    let config = RetryConfig {
        base_delay: 10.0,
        max_delay: 15.0,
        jitter: false,
        strategy: RetryStrategy::ExponentialBackoff,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let delay = manager.retry_delay(ErrorKind::RateLimit, 8).await;
    assert!((delay - 15.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_delay_floor() {
    let config = RetryConfig {
        base_delay: 0.000_1,
        jitter: false,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let delay = manager.retry_delay(ErrorKind::Api, 0).await;
    assert!(delay >= 0.1);
}

#[tokio::test]
async fn test_rate_limit_backs_off_harder_than_connection() {
    let config = RetryConfig {
        base_delay: 1.0,
        max_delay: 600.0,
        jitter: false,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let rate_limit = manager.retry_delay(ErrorKind::RateLimit, 1).await;
    let connection = manager.retry_delay(ErrorKind::Connection, 1).await;
    let api = manager.retry_delay(ErrorKind::Api, 1).await;
    assert!(rate_limit > connection);
    assert!(connection > api);
}

#[tokio::test]
async fn test_jitter_stays_within_ten_percent() {
    let config = RetryConfig {
        base_delay: 2.0,
        max_delay: 600.0,
        jitter: true,
        strategy: RetryStrategy::FixedDelay,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    for _ in 0..50 {
        // api multiplier 1.2 on a fixed 2.0s base
        let delay = manager.retry_delay(ErrorKind::Api, 0).await;
        assert!(delay >= 2.4 * 0.9 - 1e-9);
        assert!(delay <= 2.4 * 1.1 + 1e-9);
    }
}

#[tokio::test]
async fn test_adaptive_delay_grows_with_attempt() {
    let config = RetryConfig {
        base_delay: 0.5,
        max_delay: 600.0,
        jitter: false,
        strategy: RetryStrategy::Adaptive,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    // accumulate some failure gaps so the blend has history to draw on
    for _ in 0..3 {
        manager.record_failure(ErrorKind::RateLimit, "chat").await;
    }
    let d0 = manager.retry_delay(ErrorKind::RateLimit, 0).await;
    let d2 = manager.retry_delay(ErrorKind::RateLimit, 2).await;
    assert!(d2 >= d0);
}

// ==================== Circuit Gating Tests ====================

#[tokio::test]
async fn test_circuit_opens_after_threshold_and_blocks_retries() {
    let config = RetryConfig {
        failure_threshold: 3,
        recovery_timeout: 60.0,
        snapshot_every: 0,
        ..test_config()
    };
    let manager = AdaptiveRetryManager::new(config);
    for _ in 0..3 {
        manager.record_failure(ErrorKind::Connection, "chat").await;
    }
    assert_eq!(manager.circuit_state(), CircuitState::Open);
    for attempt in 0..5 {
        assert!(!manager.should_retry(ErrorKind::Connection, attempt));
    }
}

#[tokio::test]
async fn test_half_open_probe_then_close() {
    let config = RetryConfig {
        failure_threshold: 2,
        recovery_timeout: 0.02,
        success_threshold: 2,
        snapshot_every: 0,
        ..test_config()
    };
    let manager = AdaptiveRetryManager::new(config);
    manager.record_failure(ErrorKind::Api, "chat").await;
    manager.record_failure(ErrorKind::Api, "chat").await;
    assert_eq!(manager.circuit_state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.should_retry(ErrorKind::Api, 0));
    assert_eq!(manager.circuit_state(), CircuitState::HalfOpen);

    manager.record_success(0.1, "chat", 0).await;
    manager.record_success(0.1, "chat", 0).await;
    assert_eq!(manager.circuit_state(), CircuitState::Closed);
    let health = manager.health_metrics().await;
    assert_eq!(health.failure_count, 0);
}

#[tokio::test]
async fn test_should_retry_rejects_past_budget() {
    let manager = AdaptiveRetryManager::new(test_config());
    assert!(manager.should_retry(ErrorKind::Connection, 2));
    assert!(!manager.should_retry(ErrorKind::Connection, 3));
}

#[tokio::test]
async fn test_should_retry_rejects_non_transient() {
    let manager = AdaptiveRetryManager::new(test_config());
    assert!(!manager.should_retry(ErrorKind::Timeout, 0));
    assert!(!manager.should_retry(ErrorKind::Other, 0));
}

// ==================== Execute Loop Tests ====================

#[tokio::test]
async fn test_execute_eventual_success_call_count() {
    let manager = AdaptiveRetryManager::new(test_config());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result = manager
        .execute("chat", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Connection)
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_execute_exhaustion_call_count_and_original_error() {
    let manager = AdaptiveRetryManager::new(test_config());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), _> = manager
        .execute("chat", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::RateLimit)
            }
        })
        .await;
    // max_retries = 2: initial attempt plus two retries
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match result.unwrap_err() {
        ResilienceError::Call(TestError::RateLimit) => {}
        other => panic!("expected the original rate-limit error, got {other}"),
    }
}

#[tokio::test]
async fn test_execute_non_retryable_fails_on_first_attempt() {
    let manager = AdaptiveRetryManager::new(test_config());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result: Result<(), _> = manager
        .execute("chat", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            }
        })
        .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        result.unwrap_err(),
        ResilienceError::Call(TestError::Fatal)
    ));
}

#[tokio::test]
async fn test_execute_rejects_when_circuit_open() {
    let config = RetryConfig {
        failure_threshold: 1,
        recovery_timeout: 60.0,
        snapshot_every: 0,
        ..test_config()
    };
    let manager = AdaptiveRetryManager::new(config);
    manager.record_failure(ErrorKind::Api, "chat").await;
    assert_eq!(manager.circuit_state(), CircuitState::Open);

    let result = manager
        .execute("chat", || async { Ok::<_, TestError>("never runs") })
        .await;
    match result.unwrap_err() {
        ResilienceError::CircuitOpen { endpoint } => assert_eq!(endpoint, "chat"),
        other => panic!("expected circuit-open rejection, got {other}"),
    }
}

#[tokio::test]
async fn test_manager_clamps_nan_recovery_timeout() {
    let config = RetryConfig {
        recovery_timeout: f64::NAN,
        ..test_config()
    };
    let manager = AdaptiveRetryManager::new(config);
    assert!(manager.circuit_allows());
}

#[tokio::test]
async fn test_end_to_end_scenario_keeps_circuit_closed() {
    // two connection failures then success, well under the failure threshold
    let config = RetryConfig {
        max_retries: 2,
        base_delay: 0.01,
        failure_threshold: 5,
        jitter: false,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let result = manager
        .execute("chat", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Connection)
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let health = manager.health_metrics().await;
    assert_eq!(health.circuit_state, "closed");
}

// ==================== History & Health Tests ====================

#[tokio::test]
async fn test_snapshot_persisted_on_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retry_history.json");
    let config = RetryConfig {
        snapshot_path: path.clone(),
        snapshot_every: 2,
        ..test_config()
    };
    let manager = AdaptiveRetryManager::new(config);
    manager.record_failure(ErrorKind::RateLimit, "chat").await;
    manager.record_failure(ErrorKind::RateLimit, "chat").await;
    manager.record_success(0.2, "chat", 2).await;
    // third total request, not on the interval yet
    assert!(!path.exists() || HistoryStore::new(&path).load().error_patterns.is_empty());
    manager.record_success(0.2, "chat", 0).await;
    assert!(path.exists());
    let snapshot = HistoryStore::new(&path).load();
    assert!(snapshot.error_patterns.contains_key("rate_limit"));
}

#[tokio::test]
async fn test_warm_start_from_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retry_history.json");
    let store = HistoryStore::new(&path);
    let mut snapshot = RetryHistorySnapshot::default();
    snapshot.adaptive_delays.insert("rate_limit".into(), 4.0);
    store.save(&snapshot);

    let config = RetryConfig {
        snapshot_path: path,
        strategy: RetryStrategy::Adaptive,
        jitter: false,
        max_delay: 600.0,
        snapshot_every: 0,
        ..RetryConfig::default()
    };
    let manager = AdaptiveRetryManager::new(config);
    // learned base 4.0 × rate-limit multiplier 2.0
    let delay = manager.retry_delay(ErrorKind::RateLimit, 0).await;
    assert!((delay - 8.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_health_metrics_rates() {
    let manager = AdaptiveRetryManager::new(test_config());
    manager.record_success(0.1, "chat", 0).await;
    manager.record_success(0.1, "chat", 0).await;
    manager.record_failure(ErrorKind::Api, "chat").await;
    let health = manager.health_metrics().await;
    assert_eq!(health.total_requests, 3);
    assert!((health.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert!((health.recent_success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(health.tracked_error_kinds, 0); // single failure has no gap yet
    assert!(health.last_failure_secs_ago.is_some());
}
