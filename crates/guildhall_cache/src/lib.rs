//! TTL caching for expensive bot reads.
//!
//! Leaderboard queries, daily-content fetches and similar reads go through
//! [`TtlCache::get_or_compute`] so the source of truth is only consulted on a
//! miss. Entries expire after their TTL, expired entries are purged lazily on
//! access and eagerly by a background sweep.

#![warn(missing_docs)]

mod cache;
mod config;
mod named;

pub use cache::{CacheEntry, CacheStats, TtlCache};
pub use config::{CacheConfig, CacheConfigBuilder, CacheConfigBuilderError, NamespaceConfig};
pub use named::NamedCache;
