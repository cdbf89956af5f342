//! Fixed-key cache views.

use crate::{NamespaceConfig, TtlCache};
use std::future::Future;
use std::time::Duration;

/// A cache key bound to its own TTL.
///
/// Carries no state of its own; every call goes straight to the backing
/// [`TtlCache`].
///
/// # Example
///
/// ```
/// use guildhall_cache::{CacheConfig, TtlCache};
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let config = CacheConfig::default();
/// let cache = TtlCache::new(config.clone());
/// let leaderboard = config.namespace("leaderboard").unwrap();
///
/// let top = leaderboard
///     .get_or_compute(&cache, || async { Ok::<_, String>(json!(["alice", "bob"])) })
///     .await
///     .unwrap();
/// assert_eq!(top, json!(["alice", "bob"]));
/// # });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCache {
    key: String,
    ttl: Duration,
}

impl NamedCache {
    /// Bind `key` to `ttl`.
    pub fn new(key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            ttl,
        }
    }

    /// Build from a configured namespace.
    pub fn from_config(config: &NamespaceConfig) -> Self {
        Self::new(config.key().clone(), Duration::from_millis(*config.ttl_ms()))
    }

    /// The bound key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The bound TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// [`TtlCache::get_or_compute`] on the bound key and TTL.
    pub async fn get_or_compute<V, F, Fut, E>(
        &self,
        cache: &TtlCache<V>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        cache.get_or_compute(&self.key, Some(self.ttl), compute).await
    }

    /// Drop the cached value so the next read recomputes it.
    pub fn invalidate<V>(&self, cache: &TtlCache<V>) -> bool {
        cache.delete(&self.key)
    }
}
