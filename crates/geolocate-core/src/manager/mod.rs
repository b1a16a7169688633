// # Geolocation Manager
//
// Resolves provider names to ready adapters and memoizes them.
//
// ## Resolution
//
// `driver(name)`:
// 1. `None` means the configured default provider
// 2. a name already resolved in this process returns the memoized instance
// 3. otherwise the provider's settings are looked up (`UndefinedDriver` if
//    absent), its declared backend is dispatched through the registry
//    (`UnsupportedDriver` if unknown), and the result is stored
//
// The default provider is resolved eagerly when the manager is built, so a
// broken default (missing key, unreadable database) fails at startup.
//
// ## Concurrency
//
// Two tasks racing on the first use of a name may both construct an
// adapter; the last insert wins. Adapters hold no per-lookup state, so
// the duplicate is harmless.
//
// The manager itself implements `GeoProvider` by forwarding to the
// default provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::address::{ClientAddress, LookupTarget};
use crate::cache::LookupCache;
use crate::config::{BackendKind, GeolocationConfig};
use crate::countries::CountryNames;
use crate::error::{Error, Result};
use crate::record::GeolocationDetails;
use crate::registry::ProviderRegistry;
use crate::traits::{CacheStore, GeoProvider, ProviderContext, resolve_path};

/// Named-provider resolver and default-provider facade
pub struct GeolocationManager {
    table: ProviderTable,
    default: Arc<dyn GeoProvider>,
}

// Everything needed to build and memoize providers
struct ProviderTable {
    config: GeolocationConfig,
    registry: Arc<ProviderRegistry>,
    cache: LookupCache,
    client_address: Option<Arc<dyn ClientAddress>>,
    country_names: Option<Arc<dyn CountryNames>>,
    resolved: RwLock<HashMap<String, Arc<dyn GeoProvider>>>,
}

/// Builder for [`GeolocationManager`]
pub struct GeolocationManagerBuilder {
    config: GeolocationConfig,
    registry: Arc<ProviderRegistry>,
    cache_store: Option<Arc<dyn CacheStore>>,
    client_address: Option<Arc<dyn ClientAddress>>,
    country_names: Option<Arc<dyn CountryNames>>,
}

impl GeolocationManagerBuilder {
    /// Use this cache store instead of the one named in `cache.store`
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Supply the caller's observed address for lookups without an IP
    pub fn client_address(mut self, client: Arc<dyn ClientAddress>) -> Self {
        self.client_address = Some(client);
        self
    }

    /// Supply localized country names
    pub fn country_names(mut self, names: Arc<dyn CountryNames>) -> Self {
        self.country_names = Some(names);
        self
    }

    /// Validate configuration, open the cache and resolve the default provider
    pub async fn build(self) -> Result<GeolocationManager> {
        self.config.validate()?;

        let cache = match self.cache_store {
            Some(store) => LookupCache::new(store, self.config.cache.clone()),
            None if self.config.cache.enabled => {
                let store = self.registry.create_cache_store(&self.config.cache).await?;
                LookupCache::new(store, self.config.cache.clone())
            }
            None => LookupCache::disabled(),
        };

        GeolocationManager::assemble(
            self.config,
            self.registry,
            cache,
            self.client_address,
            self.country_names,
        )
    }
}

impl GeolocationManager {
    /// Start building a manager
    pub fn builder(config: GeolocationConfig, registry: Arc<ProviderRegistry>) -> GeolocationManagerBuilder {
        GeolocationManagerBuilder {
            config,
            registry,
            cache_store: None,
            client_address: None,
            country_names: None,
        }
    }

    /// Build a manager with an explicit cache and no collaborators
    pub fn new(
        config: GeolocationConfig,
        registry: Arc<ProviderRegistry>,
        cache: LookupCache,
    ) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, registry, cache, None, None)
    }

    fn assemble(
        config: GeolocationConfig,
        registry: Arc<ProviderRegistry>,
        cache: LookupCache,
        client_address: Option<Arc<dyn ClientAddress>>,
        country_names: Option<Arc<dyn CountryNames>>,
    ) -> Result<Self> {
        let table = ProviderTable {
            config,
            registry,
            cache,
            client_address,
            country_names,
            resolved: RwLock::new(HashMap::new()),
        };
        let default = table.resolve(&table.config.drivers.default)?;
        Ok(Self { table, default })
    }

    /// Resolve a provider by name (`None` for the default)
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn GeoProvider>)`: memoized or freshly built provider
    /// - `Err(UndefinedDriver)`: name not present in configuration
    /// - `Err(UnsupportedDriver)`: declared backend has no factory
    /// - `Err(Error)`: the factory rejected the provider's settings
    pub fn driver(&self, name: Option<&str>) -> Result<Arc<dyn GeoProvider>> {
        match name {
            None => Ok(self.default.clone()),
            Some(name) => self.table.resolve(name),
        }
    }

    /// Name of the default provider
    pub fn default_driver(&self) -> &str {
        &self.table.config.drivers.default
    }

    /// Configured provider names, sorted
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.config.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `name` has already been constructed
    pub fn is_resolved(&self, name: &str) -> bool {
        let resolved = self.table.resolved.read().unwrap_or_else(PoisonError::into_inner);
        resolved.contains_key(name)
    }

    /// Shared cache helper
    pub fn cache(&self) -> &LookupCache {
        &self.table.cache
    }

    /// Configuration in effect
    pub fn config(&self) -> &GeolocationConfig {
        &self.table.config
    }

    /// Drop the cached entry for `provider` (default when `None`) and `ip`
    pub async fn forget_cached(&self, provider: Option<&str>, ip: Option<&str>) -> Result<bool> {
        let provider = provider.unwrap_or(self.default_driver());
        if !self.table.config.providers.contains_key(provider) {
            return Err(Error::UndefinedDriver(provider.to_string()));
        }
        let target = LookupTarget::resolve(ip, self.table.client_address.as_deref())?;
        debug!(provider, subject = %target, "Forgetting cached geolocation");
        self.table.cache.forget(provider, &target.cache_subject()).await
    }

    /// Tag-flush every cached lookup; `false` when tags are disabled
    pub async fn flush_cache(&self) -> Result<bool> {
        self.table.cache.flush().await
    }
}

impl ProviderTable {
    fn resolve(&self, name: &str) -> Result<Arc<dyn GeoProvider>> {
        {
            let resolved = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(provider) = resolved.get(name) {
                return Ok(provider.clone());
            }
        }

        let context = self.context_for(name)?;
        let provider: Arc<dyn GeoProvider> = Arc::from(self.registry.create_provider(&context)?);

        info!(provider = name, backend = %provider.backend(), "Geolocation provider ready");

        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        resolved.insert(name.to_string(), provider.clone());
        Ok(provider)
    }

    fn context_for(&self, name: &str) -> Result<ProviderContext> {
        let mut settings = self
            .config
            .providers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedDriver(name.to_string()))?;

        if let Some(path) = settings.database_path.take() {
            settings.database_path =
                Some(resolve_path(&path, self.config.storage_path.as_deref()));
        }

        Ok(ProviderContext {
            name: name.to_string(),
            settings,
            timeout: self.config.timeout(),
            retry: self.config.retry.clone(),
            cache: self.cache.clone(),
            client_address: self.client_address.clone(),
            country_names: self.country_names.clone(),
        })
    }
}

#[async_trait]
impl GeoProvider for GeolocationManager {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.default.lookup(ip).await
    }

    fn provider_name(&self) -> &str {
        self.default.provider_name()
    }

    fn backend(&self) -> BackendKind {
        self.default.backend()
    }
}

impl std::fmt::Debug for GeolocationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationManager")
            .field("default", &self.default_driver())
            .field("providers", &self.provider_names())
            .field("cache", &self.table.cache)
            .finish()
    }
}
