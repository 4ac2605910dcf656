//! TTL'd cache of last successful responses
//!
//! Successful results are stored as JSON values keyed by endpoint plus an
//! argument key. When a later call fails and fallback is permitted, the cached
//! value can be served instead, explicitly marked as stale via
//! [`CallOutcome::Fallback`].

use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Result of a resilient call, distinguishing live data from a cached
/// substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The call succeeded and the value is live
    Fresh(T),
    /// The call failed and a cached value was substituted
    Fallback {
        /// The cached value
        value: T,
        /// Time since the value was stored
        age: Duration,
    },
}

impl<T> CallOutcome<T> {
    /// The carried value, regardless of provenance
    pub fn into_value(self) -> T {
        match self {
            Self::Fresh(value) => value,
            Self::Fallback { value, .. } => value,
        }
    }

    /// Whether this outcome came from the fallback cache
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Clone)]
struct CachedResponse {
    value: serde_json::Value,
    stored_at: Instant,
}

/// Async TTL cache of serialized successful responses
pub struct FallbackCache {
    cache: Cache<String, CachedResponse>,
}

impl FallbackCache {
    /// Create a cache bounded by entry count with per-entry TTL in seconds
    pub fn new(max_entries: u64, ttl_secs: f64) -> Self {
        // from_secs_f64 panics on negative or non-finite input
        let ttl = ttl_secs.max(0.001).min(u32::MAX as f64);
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(Duration::from_secs_f64(ttl))
                .build(),
        }
    }

    fn key(endpoint: &str, args_key: &str) -> String {
        format!("{endpoint}::{args_key}")
    }

    /// Store a successful response. Serialization failures are logged and
    /// dropped; the live result must not be affected by cache bookkeeping.
    pub async fn store<T: Serialize>(&self, endpoint: &str, args_key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.cache
                    .insert(
                        Self::key(endpoint, args_key),
                        CachedResponse {
                            value,
                            stored_at: Instant::now(),
                        },
                    )
                    .await;
            }
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "failed to serialize response for fallback cache");
            }
        }
    }

    /// Look up a cached response, returning the value and its age
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        args_key: &str,
    ) -> Option<(T, Duration)> {
        let entry = self.cache.get(&Self::key(endpoint, args_key)).await?;
        let age = entry.stored_at.elapsed();
        match serde_json::from_value(entry.value) {
            Ok(value) => {
                debug!(endpoint = %endpoint, age_secs = age.as_secs_f64(), "serving fallback response");
                Some((value, age))
            }
            Err(err) => {
                warn!(endpoint = %endpoint, error = %err, "cached fallback response failed to deserialize");
                None
            }
        }
    }

    /// Number of live entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_lookup_round_trips() {
        let cache = FallbackCache::new(10, 60.0);
        cache.store("chat", "k1", &"hello".to_string()).await;
        let (value, age) = cache.lookup::<String>("chat", "k1").await.unwrap();
        assert_eq!(value, "hello");
        assert!(age < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_lookup_misses_on_unknown_key() {
        let cache = FallbackCache::new(10, 60.0);
        cache.store("chat", "k1", &1u32).await;
        assert!(cache.lookup::<u32>("chat", "other").await.is_none());
        assert!(cache.lookup::<u32>("embeddings", "k1").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = FallbackCache::new(10, 0.02);
        cache.store("chat", "k1", &1u32).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.lookup::<u32>("chat", "k1").await.is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = FallbackCache::new(10, 60.0);
        cache.store("chat", "k1", &"text".to_string()).await;
        assert!(cache.lookup::<u32>("chat", "k1").await.is_none());
    }

    #[tokio::test]
    async fn test_negative_ttl_clamps_instead_of_panicking() {
        let cache = FallbackCache::new(10, -5.0);
        cache.store("chat", "k1", &1u32).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.lookup::<u32>("chat", "k1").await.is_none());
    }

    #[test]
    fn test_outcome_accessors() {
        let fresh = CallOutcome::Fresh(5);
        assert!(!fresh.is_fallback());
        assert_eq!(fresh.into_value(), 5);

        let stale = CallOutcome::Fallback {
            value: 7,
            age: Duration::from_secs(3),
        };
        assert!(stale.is_fallback());
        assert_eq!(stale.into_value(), 7);
    }
}
