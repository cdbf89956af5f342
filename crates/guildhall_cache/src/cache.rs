//! TTL cache implementation.

use crate::CacheConfig;
use derive_getters::Getters;
use guildhall_core::{Clock, SharedClock, Sweep, SweeperSlot, SystemClock};
use guildhall_error::{GuildhallResult, JsonError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Cache entry with value, expiration and access bookkeeping.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            hit_count: 0,
            last_accessed: now,
        }
    }

    /// Whether the entry has outlived its TTL at `now`.
    ///
    /// An entry is still valid at exactly `created_at + ttl`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }

    /// Time left before the entry expires.
    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.ttl
            .checked_sub(now.saturating_duration_since(self.created_at))
    }
}

/// Point-in-time cache metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Successful lookups
    pub hits: u64,
    /// Lookups that found nothing or an expired entry
    pub misses: u64,
    /// Stores
    pub sets: u64,
    /// Explicit deletes
    pub deletes: u64,
    /// `hits / (hits + misses)`, 0.0 before any lookup
    pub hit_rate: f64,
    /// Entries currently held, including expired ones not yet swept
    pub entries: usize,
    /// Rough serialized size of keys and values in bytes
    pub approx_memory_bytes: usize,
}

struct CacheStore<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    clock: SharedClock,
}

impl<V> CacheStore<V> {
    fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.remove(key);
        }

        if !expired.is_empty() {
            info!(
                removed = expired.len(),
                remaining = entries.len(),
                "Swept expired cache entries"
            );
        }
        expired.len()
    }
}

impl<V: Send + 'static> Sweep for CacheStore<V> {
    fn name(&self) -> &'static str {
        "ttl_cache"
    }

    fn sweep(&self) -> usize {
        self.evict_expired()
    }
}

/// String-keyed cache with per-entry TTL.
///
/// Values are handed out as clones, so callers cannot mutate cached state
/// through a returned value. All operations lock the map once and never hold
/// the lock across an await.
///
/// # Example
///
/// ```
/// use guildhall_cache::{CacheConfig, TtlCache};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let cache = TtlCache::new(CacheConfig::default());
/// cache.set("leaderboard", json!([{"user": 1, "points": 40}]), Some(Duration::from_secs(60)));
///
/// assert!(cache.get("leaderboard").is_some());
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct TtlCache<V = serde_json::Value> {
    config: CacheConfig,
    store: Arc<CacheStore<V>>,
    sweeper: SweeperSlot,
}

impl<V> TtlCache<V> {
    /// Create a cache reading time from the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: SharedClock) -> Self {
        debug!(
            default_ttl_ms = config.default_ttl_ms(),
            sweep_interval_ms = config.sweep_interval_ms(),
            "Creating new TtlCache"
        );
        Self {
            config,
            store: Arc::new(CacheStore {
                entries: Mutex::new(HashMap::new()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                sets: AtomicU64::new(0),
                deletes: AtomicU64::new(0),
                clock,
            }),
            sweeper: SweeperSlot::new(),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// `ttl` falls back to the configured default when `None`.
    #[instrument(skip(self, key, value), fields(key = %key.as_ref()))]
    pub fn set(&self, key: impl AsRef<str>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        let now = self.store.clock.now();

        let mut entries = self.store.entries.lock();
        let replaced = entries
            .insert(key.as_ref().to_string(), CacheEntry::new(value, now, ttl))
            .is_some();
        self.store.sets.fetch_add(1, Ordering::Relaxed);

        debug!(replaced, ttl_ms = ttl.as_millis() as u64, "Inserted entry into cache");
    }

    /// Fetch a live value.
    ///
    /// Returns `None` for unknown keys and for expired entries, which are
    /// removed on the spot. Both count as a miss.
    #[instrument(skip(self))]
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let now = self.store.clock.now();
        let mut entries = self.store.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.store.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss");
                return None;
            }
        };

        if expired {
            entries.remove(key);
            self.store.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache entry expired, removing");
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.hit_count += 1;
        entry.last_accessed = now;
        self.store.hits.fetch_add(1, Ordering::Relaxed);

        debug!(
            hit_count = entry.hit_count,
            time_remaining = ?entry.time_remaining_at(now),
            "Cache hit"
        );
        Some(entry.value.clone())
    }

    /// Fetch a live value, computing and storing it on a miss.
    ///
    /// If `compute` fails its error is returned and nothing is cached.
    /// Concurrent misses on the same key may each run `compute`; the last
    /// result stored wins.
    #[instrument(skip(self, compute))]
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = match compute().await {
            Ok(value) => value,
            Err(e) => {
                debug!("Compute failed, nothing cached");
                return Err(e);
            }
        };

        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Remove an entry. Returns whether one existed.
    #[instrument(skip(self))]
    pub fn delete(&self, key: &str) -> bool {
        let existed = self.store.entries.lock().remove(key).is_some();
        self.store.deletes.fetch_add(1, Ordering::Relaxed);
        debug!(existed, "Deleted cache entry");
        existed
    }

    /// Whether a live entry exists for `key`. Does not touch the metrics.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.store.clock.now();
        self.store
            .entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.store.entries.lock();
        let count = entries.len();
        entries.clear();
        info!(cleared = count, "Cleared cache");
    }

    /// Number of entries held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.store.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.entries.lock().is_empty()
    }

    /// Evict every expired entry now. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        self.store.evict_expired()
    }

    /// Snapshot of the cache metrics.
    ///
    /// The memory figure is an estimate from serialized sizes and reads 0 if
    /// any value fails to serialize.
    pub fn stats(&self) -> CacheStats
    where
        V: Serialize,
    {
        let hits = self.store.hits.load(Ordering::Relaxed);
        let misses = self.store.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        let entries = self.store.entries.lock();
        let approx_memory_bytes = estimate_memory(&entries).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to estimate cache memory");
            0
        });

        CacheStats {
            hits,
            misses,
            sets: self.store.sets.load(Ordering::Relaxed),
            deletes: self.store.deletes.load(Ordering::Relaxed),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            entries: entries.len(),
            approx_memory_bytes,
        }
    }

    /// Start the background sweep on the configured interval.
    ///
    /// Does nothing if a sweeper is already running. Must be called from
    /// within a tokio runtime.
    pub fn start_sweeper(&self)
    where
        V: Send + 'static,
    {
        self.sweeper
            .start(Arc::downgrade(&self.store), self.config.sweep_interval());
    }

    /// Stop the background sweep. Entries are kept.
    pub fn close(&self) {
        self.sweeper.stop();
    }

    /// Whether a background sweep is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

fn estimate_memory<V: Serialize>(
    entries: &HashMap<String, CacheEntry<V>>,
) -> GuildhallResult<usize> {
    let mut total = 0;
    for (key, entry) in entries {
        let bytes = serde_json::to_vec(&entry.value).map_err(|e| {
            JsonError::new(format!("Failed to serialize value for '{}': {}", key, e))
        })?;
        total += key.len() + bytes.len();
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guildhall_core::ManualClock;
    use serde::ser::Error as _;
    use serde_json::json;

    fn cache_with_clock() -> (TtlCache, ManualClock) {
        let clock = ManualClock::new();
        (
            TtlCache::with_clock(CacheConfig::default(), clock.shared()),
            clock,
        )
    }

    #[test]
    fn test_entry_valid_through_exact_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", json!(1), Some(Duration::from_millis(1000)));

        clock.advance_ms(1000);
        assert_eq!(cache.get("k"), Some(json!(1)));

        clock.advance_ms(1);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_set_resets_hit_count() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", json!("a"), None);
        cache.get("k");
        cache.get("k");
        assert_eq!(*cache.store.entries.lock()["k"].hit_count(), 2);

        cache.set("k", json!("b"), None);
        assert_eq!(*cache.store.entries.lock()["k"].hit_count(), 0);
        assert_eq!(cache.get("k"), Some(json!("b")));
    }

    #[test]
    fn test_get_updates_last_accessed() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", json!(true), None);
        let created = *cache.store.entries.lock()["k"].created_at();

        clock.advance_ms(500);
        cache.get("k");

        let accessed = *cache.store.entries.lock()["k"].last_accessed();
        assert_eq!(accessed - created, Duration::from_millis(500));
    }

    #[test]
    fn test_expired_get_removes_entry() {
        let (cache, clock) = cache_with_clock();
        cache.set("k", json!(1), Some(Duration::from_millis(10)));
        clock.advance_ms(11);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_returned_value_is_a_copy() {
        let (cache, _clock) = cache_with_clock();
        cache.set("k", json!({"points": 1}), None);

        let mut value = cache.get("k").unwrap();
        value["points"] = json!(999);

        assert_eq!(cache.get("k").unwrap()["points"], 1);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("not serializable"))
        }
    }

    #[test]
    fn test_memory_estimate_failure_reports_zero() {
        let cache: TtlCache<Unserializable> = TtlCache::new(CacheConfig::default());
        cache.set("k", Unserializable, None);

        let stats = cache.stats();
        assert_eq!(stats.approx_memory_bytes, 0);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_memory_estimate_counts_keys_and_values() {
        let (cache, _clock) = cache_with_clock();
        cache.set("ab", json!("xyz"), None);
        // "ab" + "\"xyz\""
        assert_eq!(cache.stats().approx_memory_bytes, 2 + 5);
    }
}
