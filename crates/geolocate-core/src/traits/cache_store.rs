// # Cache Store Trait
//
// Storage behind the cache-aside helper. Values are raw canonical maps,
// never `GeolocationDetails`, so cached entries are provider-agnostic.
//
// ## Implementations
//
// - `MemoryCacheStore`: in-process, lost on restart
// - `FileCacheStore`: JSON file with atomic writes and backup recovery
//
// Hosts with a shared cache (Redis, memcached, ...) implement the trait
// themselves and register a `CacheStoreFactory` under their own name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::record::RawRecord;

/// One stored value with its expiry
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    /// Canonical raw record
    pub value: RawRecord,
    /// Absolute expiry time
    pub expires_at: DateTime<Utc>,
    /// Tags the entry was written under
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CacheEntry {
    /// Create an entry expiring `ttl` from now
    pub fn new(value: RawRecord, ttl: Duration, tags: &[String]) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value,
            expires_at,
            tags: tags.to_vec(),
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether the entry carries any of `tags`
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Trait for cache store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry's value
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RawRecord))`: hit
    /// - `Ok(None)`: miss or expired
    /// - `Err(Error)`: storage error
    async fn get(&self, key: &str) -> Result<Option<RawRecord>>;

    /// Store a value for `ttl`, tagged with `tags` (may be empty)
    async fn put(&self, key: &str, value: &RawRecord, ttl: Duration, tags: &[String])
    -> Result<()>;

    /// Remove one entry
    ///
    /// Returns `true` if an entry was removed.
    async fn forget(&self, key: &str) -> Result<bool>;

    /// Remove every entry carrying any of `tags`
    ///
    /// Stores without tag support return `Ok(false)` and leave their
    /// contents alone.
    async fn flush_tags(&self, _tags: &[String]) -> Result<bool> {
        Ok(false)
    }

    /// Whether `flush_tags` is supported
    fn supports_tags(&self) -> bool {
        false
    }
}

/// Helper trait for constructing cache stores from configuration
#[async_trait]
pub trait CacheStoreFactory: Send + Sync {
    /// Create a CacheStore instance from the cache settings
    async fn create(&self, config: &CacheConfig) -> Result<std::sync::Arc<dyn CacheStore>>;
}
