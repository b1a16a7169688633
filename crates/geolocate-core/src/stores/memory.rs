// # Memory Cache Store
//
// In-process implementation of CacheStore on top of a moka cache.
//
// Entries vanish on restart. Each entry expires at its own `expires_at`
// and moka evicts it in the background, so expired keys never pile up.
// The store is bounded by `max_capacity` entries. Tags are kept on each
// entry and `flush_tags` registers an invalidation predicate over them.

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::record::RawRecord;
use crate::traits::{CacheEntry, CacheStore, CacheStoreFactory};

/// Entry count used when no capacity is configured
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

// Keeps far-future deadlines inside moka's clock range
const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Expiry policy reading each entry's own deadline
struct EntryExpiry;

impl EntryExpiry {
    fn remaining(entry: &CacheEntry) -> Option<Duration> {
        let left = entry.expires_at - chrono::Utc::now();
        Some(left.to_std().unwrap_or(Duration::ZERO).min(MAX_LIFETIME))
    }
}

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    // A rewrite carries its own ttl
    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Self::remaining(value)
    }
}

/// In-memory cache store
///
/// # Example
///
/// ```rust,no_run
/// use geolocate_core::stores::MemoryCacheStore;
/// use geolocate_core::traits::CacheStore;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryCacheStore::new();
///     let raw = geolocate_core::RawRecord::new();
///
///     store.put("geolocation:ipinfo:abc", &raw, Duration::from_secs(60), &[]).await?;
///     assert!(store.get("geolocation:ipinfo:abc").await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct MemoryCacheStore {
    inner: Cache<String, CacheEntry>,
    max_capacity: u64,
}

impl MemoryCacheStore {
    /// Create a new empty store holding up to `DEFAULT_MAX_CAPACITY` entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a new empty store holding up to `max_capacity` entries
    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .support_invalidation_closures()
            .build();

        tracing::debug!(max_capacity, "Memory cache store initialized");
        Self {
            inner,
            max_capacity,
        }
    }

    /// Number of live entries, after pending evictions have run
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entries", &self.inner.entry_count())
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<RawRecord>> {
        Ok(self
            .inner
            .get(key)
            .await
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value))
    }

    async fn put(
        &self,
        key: &str,
        value: &RawRecord,
        ttl: Duration,
        tags: &[String],
    ) -> Result<()> {
        let entry = CacheEntry::new(value.clone(), ttl, tags);
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        Ok(self.inner.remove(key).await.is_some())
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<bool> {
        let tags = tags.to_vec();
        self.inner
            .invalidate_entries_if(move |_, entry| entry.has_any_tag(&tags))
            .map_err(|e| Error::cache(format!("Tag flush rejected: {}", e)))?;
        Ok(true)
    }

    fn supports_tags(&self) -> bool {
        true
    }
}

/// Factory for the "memory" store name
pub struct MemoryCacheStoreFactory;

#[async_trait]
impl CacheStoreFactory for MemoryCacheStoreFactory {
    async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
        Ok(Arc::new(MemoryCacheStore::with_capacity(config.max_capacity)))
    }
}
