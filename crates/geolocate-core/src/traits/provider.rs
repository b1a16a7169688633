// # Geolocation Provider Trait
//
// Defines the single lookup contract every backend adapter implements.
//
// ## Contract
//
// `lookup(ip)` either returns a fully normalized record or a typed error:
// - an invalid IP literal fails with `InvalidAddress` before any cache or
//   network access
// - an omitted IP resolves to the caller's own address (through the
//   `ClientAddress` collaborator) or the backend's "self" endpoint
// - successful fetches are written through the shared `LookupCache`;
//   failures are never cached
//
// ## Usage
//
// ```rust,ignore
// let provider = manager.driver(Some("ipinfo"))?;
// let details = provider.lookup(Some("8.8.8.8")).await?;
// println!("{} ({:?})", details, details.country_code());
// ```

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::address::{ClientAddress, LookupTarget};
use crate::cache::LookupCache;
use crate::config::{BackendKind, ProviderSettings, RetryConfig};
use crate::countries::CountryNames;
use crate::error::{Error, Result};
use crate::record::{GeolocationDetails, RawRecord};

/// Trait for geolocation backends
///
/// Implementations must be stateless after construction apart from their
/// HTTP client or database handle, so one instance can serve concurrent
/// lookups.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Resolve an IP address (or the caller's own when `None`)
    ///
    /// # Returns
    ///
    /// - `Ok(GeolocationDetails)`: normalized record
    /// - `Err(Error)`: invalid address, backend failure, missing essentials
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails>;

    /// Configured name of this provider instance (e.g., "ipinfo")
    fn provider_name(&self) -> &str;

    /// Backend kind behind this instance
    fn backend(&self) -> BackendKind;
}

/// Everything a factory needs to build one provider instance
#[derive(Clone)]
pub struct ProviderContext {
    /// Configured provider name, used in cache keys and error messages
    pub name: String,

    /// Settings for this provider
    pub settings: ProviderSettings,

    /// Remote request timeout
    pub timeout: Duration,

    /// Retry knobs (passed through, not acted on)
    pub retry: RetryConfig,

    /// Shared cache-aside helper
    pub cache: LookupCache,

    /// Caller address collaborator
    pub client_address: Option<Arc<dyn ClientAddress>>,

    /// Country name localization collaborator
    pub country_names: Option<Arc<dyn CountryNames>>,
}

impl ProviderContext {
    /// Context with default timeout, no cache and no collaborators
    pub fn new(name: impl Into<String>, settings: ProviderSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            cache: LookupCache::disabled(),
            client_address: None,
            country_names: None,
        }
    }

    /// Use a different timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a shared cache
    pub fn with_cache(mut self, cache: LookupCache) -> Self {
        self.cache = cache;
        self
    }

    /// Attach a caller address collaborator
    pub fn with_client_address(mut self, client: Arc<dyn ClientAddress>) -> Self {
        self.client_address = Some(client);
        self
    }

    /// Attach a localization collaborator
    pub fn with_country_names(mut self, names: Arc<dyn CountryNames>) -> Self {
        self.country_names = Some(names);
        self
    }

    /// Required secret, or `MissingCredential`
    pub fn require_secret(&self, field: &str) -> Result<String> {
        self.settings
            .secret(field)
            .map(str::to_string)
            .ok_or_else(|| Error::missing_credential(&self.name, field))
    }

    /// Optional secret
    pub fn optional_secret(&self, field: &str) -> Option<String> {
        self.settings.secret(field).map(str::to_string)
    }

    /// Configured base URL override, or the backend default
    pub fn base_url(&self, default: &str) -> String {
        self.settings
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    /// Configured database path
    pub fn database_path(&self) -> Option<&Path> {
        self.settings.database_path.as_deref()
    }

    /// Lookup plumbing bound to this provider's name and collaborators
    pub fn lookup_flow(&self) -> LookupFlow {
        LookupFlow {
            name: self.name.clone(),
            cache: self.cache.clone(),
            client_address: self.client_address.clone(),
            country_names: self.country_names.clone(),
        }
    }
}

/// Validation, cache-aside and normalization shared by every adapter
///
/// Adapters supply only the backend fetch; `run` validates the address,
/// consults the cache and expands the raw map into a record.
#[derive(Clone)]
pub struct LookupFlow {
    name: String,
    cache: LookupCache,
    client_address: Option<Arc<dyn ClientAddress>>,
    country_names: Option<Arc<dyn CountryNames>>,
}

impl LookupFlow {
    /// Provider name used for cache keys
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one lookup, calling `fetch` only on a cache miss
    pub async fn run<F, Fut>(&self, ip: Option<&str>, fetch: F) -> Result<GeolocationDetails>
    where
        F: FnOnce(LookupTarget) -> Fut,
        Fut: Future<Output = Result<RawRecord>>,
    {
        let target = LookupTarget::resolve(ip, self.client_address.as_deref())?;
        let raw = self
            .cache
            .remember(&self.name, &target.cache_subject(), || fetch(target))
            .await?;
        Ok(GeolocationDetails::from_raw_localized(
            &raw,
            self.country_names.as_deref(),
        ))
    }
}

impl std::fmt::Debug for LookupFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupFlow")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .field("client_address", &self.client_address.is_some())
            .finish()
    }
}

/// Resolve `path` against `base` when it is relative
pub fn resolve_path(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Helper trait for constructing providers from configuration
pub trait ProviderFactory: Send + Sync {
    /// Create a provider instance
    ///
    /// Factories validate eagerly: missing credentials, unreadable files
    /// and other configuration problems fail here, not at first lookup.
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>>;
}
