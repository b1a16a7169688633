//! Backend factory registry
//!
//! Maps each `BackendKind` to the factory that builds it, and each cache
//! store name to its factory. Backend crates register themselves:
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::new();
//! geolocate_core::stores::register(&registry);
//! geolocate_provider_http::register(&registry);
//! geolocate_provider_maxmind::register(&registry);
//! ```
//!
//! A kind with no registered factory resolves to `UnsupportedDriver`.

use crate::config::{BackendKind, CacheConfig};
use crate::error::{Error, Result};
use crate::traits::{CacheStore, CacheStoreFactory, GeoProvider, ProviderContext, ProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of provider and cache store factories
///
/// ## Thread Safety
///
/// Interior mutability through RwLock allows concurrent reads and
/// exclusive writes, so registration works through a shared reference.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<BackendKind, Arc<dyn ProviderFactory>>>,
    cache_stores: RwLock<HashMap<String, Arc<dyn CacheStoreFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for a backend kind
    pub fn register_provider(&self, kind: BackendKind, factory: Box<dyn ProviderFactory>) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(kind, Arc::from(factory));
    }

    /// Register (or replace) a cache store factory
    pub fn register_cache_store(&self, name: impl Into<String>, factory: Box<dyn CacheStoreFactory>) {
        let mut stores = self.cache_stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Build a provider for the context's declared backend
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn GeoProvider>)`: constructed provider
    /// - `Err(UnsupportedDriver)`: unknown driver string or no factory
    /// - `Err(Error)`: the factory rejected the configuration
    pub fn create_provider(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        let kind = context.settings.backend()?;

        let factory = {
            let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
            providers
                .get(&kind)
                .cloned()
                .ok_or_else(|| Error::UnsupportedDriver(kind.to_string()))?
        };

        factory.create(context)
    }

    /// Build the cache store named by `config.store` (memory by default)
    pub async fn create_cache_store(&self, config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
        let name = config.store_name();

        let factory = {
            let stores = self.cache_stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(name)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown cache store: {}", name)))?
        };

        factory.create(config).await
    }

    /// List registered backend kinds
    pub fn list_providers(&self) -> Vec<BackendKind> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.keys().copied().collect()
    }

    /// List registered cache store names
    pub fn list_cache_stores(&self) -> Vec<String> {
        let stores = self.cache_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a backend kind is registered
    pub fn has_provider(&self, kind: BackendKind) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(&kind)
    }

    /// Check if a cache store name is registered
    pub fn has_cache_store(&self, name: &str) -> bool {
        let stores = self.cache_stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
