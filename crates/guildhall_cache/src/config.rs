//! Cache configuration.

use crate::NamedCache;
use derive_getters::Getters;
use guildhall_error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A fixed cache key with its own TTL, such as the daily question or the leaderboard.
///
/// ```toml
/// [cache.namespaces.leaderboard]
/// key = "leaderboard"
/// ttl_ms = 300_000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct NamespaceConfig {
    /// Cache key the namespace reads and writes
    key: String,
    /// TTL for values stored under the key (milliseconds)
    ttl_ms: u64,
}

impl NamespaceConfig {
    /// Create a namespace bound to `key` with the given TTL.
    pub fn new(key: impl Into<String>, ttl_ms: u64) -> Self {
        Self {
            key: key.into(),
            ttl_ms,
        }
    }
}

/// Configuration for [`TtlCache`](crate::TtlCache).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default, setter(into))]
pub struct CacheConfig {
    /// TTL applied when a caller does not pass one (milliseconds)
    #[serde(default = "default_ttl_ms")]
    default_ttl_ms: u64,

    /// Interval between background sweeps (milliseconds)
    #[serde(default = "default_sweep_interval_ms")]
    sweep_interval_ms: u64,

    /// Named keys with their own TTLs
    #[serde(default = "default_namespaces")]
    namespaces: HashMap<String, NamespaceConfig>,
}

fn default_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_sweep_interval_ms() -> u64 {
    600_000 // 10 minutes
}

fn default_namespaces() -> HashMap<String, NamespaceConfig> {
    HashMap::from([
        (
            "daily_question".to_string(),
            NamespaceConfig::new("daily_question", 86_400_000),
        ),
        (
            "leaderboard".to_string(),
            NamespaceConfig::new("leaderboard", 300_000),
        ),
    ])
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            namespaces: default_namespaces(),
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Default TTL as a duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Look up a configured namespace.
    pub fn namespace(&self, name: &str) -> Option<NamedCache> {
        self.namespaces.get(name).map(NamedCache::from_config)
    }

    /// Validates that every interval is non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first zero field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl_ms == 0 {
            return Err(ConfigError::new("cache.default_ttl_ms must be greater than zero"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::new(
                "cache.sweep_interval_ms must be greater than zero",
            ));
        }
        if let Some((name, _)) = self.namespaces.iter().find(|(_, ns)| ns.ttl_ms == 0) {
            return Err(ConfigError::new(format!(
                "cache.namespaces.{}.ttl_ms must be greater than zero",
                name
            )));
        }
        Ok(())
    }
}
