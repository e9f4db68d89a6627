//! Cache tier: a named TTL store with counters and an optional single-flight gate.

use super::backend::{CacheStats, TtlCache};
use super::key::CacheKey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: Option<usize>,
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_entries: Some(10_000),
            single_flight: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }
}

/// Lookup counters for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
}

impl CacheCounters {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl AtomicCounters {
    fn snapshot(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
        }
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Per-key async gates. A key has a gate only while someone is filling it.
#[derive(Default)]
struct InFlight {
    gates: Mutex<HashMap<String, Gate>>,
}

impl InFlight {
    fn join(&self, key: &str) -> Gate {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(key.to_string()).or_default())
    }

    fn leave(&self, key: &str, gate: &Gate) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus the caller's own: nobody else is waiting.
        if Arc::strong_count(gate) <= 2 {
            gates.remove(key);
        }
    }
}

/// Membership in a key's gate, released on drop so cancelled fills clean up.
struct Flight<'a> {
    inflight: &'a InFlight,
    key: &'a str,
    gate: Gate,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.inflight.leave(self.key, &self.gate);
    }
}

/// One cache tier (`weather` or `insight`).
///
/// Values are only written after the fill future resolves to `Ok`, so
/// failures are never cached and a fill dropped mid-flight writes nothing.
pub struct CacheTier<V> {
    name: &'static str,
    config: CacheConfig,
    store: TtlCache<V>,
    counters: AtomicCounters,
    inflight: InFlight,
}

impl<V: Clone> CacheTier<V> {
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let store = match config.max_entries {
            Some(max) => TtlCache::new().with_max_entries(max),
            None => TtlCache::new(),
        };
        Self {
            name,
            config,
            store,
            counters: AtomicCounters::default(),
            inflight: InFlight::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        match self.store.get(key.as_str()) {
            Some(v) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(tier = self.name, key = %key, "cache hit");
                Some(v)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(tier = self.name, key = %key, "cache miss");
                None
            }
        }
    }

    /// Store with the tier's TTL.
    pub fn set(&self, key: &CacheKey, value: V) {
        self.set_with_ttl(key, value, self.config.ttl);
    }

    pub fn set_with_ttl(&self, key: &CacheKey, value: V, ttl: Duration) {
        self.store.set(key.as_str(), value, ttl);
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the cached value for `key`, or run `fill` and cache its `Ok` result.
    ///
    /// With single-flight enabled, concurrent misses on the same key queue
    /// behind one gate; the first caller fills, the rest re-read the cache
    /// once it is their turn. If the first fill fails the next waiter tries
    /// its own.
    pub async fn get_or_try_fill<F, Fut, E>(&self, key: &CacheKey, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }
        if !self.config.single_flight {
            return self.fill_and_store(key, fill).await;
        }

        let flight = Flight {
            inflight: &self.inflight,
            key: key.as_str(),
            gate: self.inflight.join(key.as_str()),
        };
        let _turn = flight.gate.lock().await;

        if let Some(v) = self.store.get(key.as_str()) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(tier = self.name, key = %key, "cache filled by concurrent request");
            return Ok(v);
        }
        self.fill_and_store(key, fill).await
    }

    async fn fill_and_store<F, Fut, E>(&self, key: &CacheKey, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let value = fill().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.store.remove(key.as_str())
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn tier(single_flight: bool) -> CacheTier<String> {
        CacheTier::new(
            "test",
            CacheConfig::new()
                .with_ttl(Duration::from_secs(60))
                .with_single_flight(single_flight),
        )
    }

    #[tokio::test]
    async fn test_fill_on_miss_then_hit() {
        let cache = tier(true);
        let key = CacheKey::new("k");
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let v: Result<String, ()> = cache
                .get_or_try_fill(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("v".to_string())
                })
                .await;
            assert_eq!(v.unwrap(), "v");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let counters = cache.counters();
        assert_eq!(counters.misses, 1);
        assert_eq!(counters.hits, 2);
        assert_eq!(counters.sets, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = tier(true);
        let key = CacheKey::new("k");

        let r: Result<String, &str> = cache.get_or_try_fill(&key, || async { Err("boom") }).await;
        assert_eq!(r, Err("boom"));
        assert_eq!(cache.stats().size, 0);

        let r: Result<String, &str> = cache
            .get_or_try_fill(&key, || async { Ok("ok".to_string()) })
            .await;
        assert_eq!(r.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_collapses_concurrent_misses() {
        let cache = tier(true);
        let key = CacheKey::new("k");
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let fill = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, ()>("v".to_string())
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_try_fill(&key, fill),
            cache.get_or_try_fill(&key, fill),
            cache.get_or_try_fill(&key, fill),
        );
        assert_eq!(a.unwrap(), "v");
        assert_eq!(b.unwrap(), "v");
        assert_eq!(c.unwrap(), "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.gates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_single_flight_concurrent_misses_all_fill() {
        let cache = tier(false);
        let key = CacheKey::new("k");
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let fill = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, ()>("v".to_string())
        };

        let (a, b) = tokio::join!(
            cache.get_or_try_fill(&key, fill),
            cache.get_or_try_fill(&key, fill),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().size, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fill_writes_nothing() {
        let cache = tier(true);
        let key = CacheKey::new("k");

        let slow = cache.get_or_try_fill(&key, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ()>("late".to_string())
        });
        let outcome = tokio::time::timeout(Duration::from_secs(1), slow).await;
        assert!(outcome.is_err());

        assert_eq!(cache.stats().size, 0);
        assert!(cache.inflight.gates.lock().unwrap().is_empty());
    }
}
