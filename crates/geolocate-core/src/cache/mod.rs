// # Cache-Aside Helper
//
// Wraps a provider's fetch with get-or-compute semantics:
//
// 1. Look the key up; a hit returns without calling the fetch at all.
// 2. On a miss, run the fetch. Success is stored with the configured TTL,
//    failure is returned untouched and nothing is written.
//
// Keys are `"{prefix}:{provider}:{xxh64(subject)}"` where the subject is
// the IP literal or `"current"` for self lookups.
//
// Store failures never fail a lookup: an unreadable store counts as a
// miss and an unwritable one just skips the write.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use xxhash_rust::xxh64::xxh64;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::record::RawRecord;
use crate::traits::CacheStore;

/// Shared cache-aside helper held by every provider
#[derive(Clone)]
pub struct LookupCache {
    store: Option<Arc<dyn CacheStore>>,
    config: CacheConfig,
}

impl LookupCache {
    /// Cache backed by `store`, honoring `config.enabled`
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            store: Some(store),
            config,
        }
    }

    /// A cache that always runs the fetch
    pub fn disabled() -> Self {
        Self {
            store: None,
            config: CacheConfig::disabled(),
        }
    }

    /// Whether reads and writes go to the store
    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.store.is_some()
    }

    /// Cache settings in effect
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entry lifetime
    pub fn ttl(&self) -> Duration {
        self.config.ttl()
    }

    /// Derive the key for a provider and lookup subject
    pub fn key(&self, provider: &str, subject: &str) -> String {
        cache_key(&self.config.prefix, provider, subject)
    }

    fn tags(&self) -> &[String] {
        if self.config.tags.enabled {
            &self.config.tags.names
        } else {
            &[]
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref().filter(|_| self.config.enabled)
    }

    /// Get-or-compute
    ///
    /// # Parameters
    ///
    /// - `provider`: provider name (namespaces the key)
    /// - `subject`: IP literal or `"current"`
    /// - `fetch`: called only on a miss
    pub async fn remember<F, Fut>(&self, provider: &str, subject: &str, fetch: F) -> Result<RawRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RawRecord>>,
    {
        let Some(store) = self.active_store() else {
            return fetch().await;
        };

        let key = self.key(provider, subject);

        match store.get(&key).await {
            Ok(Some(raw)) => {
                tracing::debug!(provider, subject, "Geolocation cache hit");
                return Ok(raw);
            }
            Ok(None) => {
                tracing::debug!(provider, subject, "Geolocation cache miss");
            }
            Err(e) => {
                tracing::warn!(provider, "Cache read failed, treating as miss: {}", e);
            }
        }

        let raw = fetch().await?;

        if let Err(e) = store.put(&key, &raw, self.ttl(), self.tags()).await {
            tracing::warn!(provider, "Cache write failed: {}", e);
        }

        Ok(raw)
    }

    /// Drop the entry for a provider and subject
    pub async fn forget(&self, provider: &str, subject: &str) -> Result<bool> {
        match &self.store {
            Some(store) => store.forget(&self.key(provider, subject)).await,
            None => Ok(false),
        }
    }

    /// Bulk-invalidate everything written under the configured tags
    ///
    /// Without tags this returns `false` and touches nothing, so a shared
    /// store is never wiped wholesale.
    pub async fn flush(&self) -> Result<bool> {
        match &self.store {
            Some(store) if self.config.tags.enabled && store.supports_tags() => {
                store.flush_tags(&self.config.tags.names).await
            }
            _ => Ok(false),
        }
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("enabled", &self.is_enabled())
            .field("config", &self.config)
            .finish()
    }
}

/// Derive a cache key
pub fn cache_key(prefix: &str, provider: &str, subject: &str) -> String {
    format!("{}:{}:{:016x}", prefix, provider, xxh64(subject.as_bytes(), 0))
}
