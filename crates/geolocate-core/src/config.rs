//! Configuration types for the geolocate system
//!
//! The whole tree deserializes from the same shape the environment loader
//! in the `geolocate` crate produces:
//!
//! ```json
//! {
//!   "drivers": { "default": "ipinfo" },
//!   "providers": {
//!     "ipinfo": { "driver": "ipinfo", "access_token": "..." },
//!     "maxmind": { "driver": "maxmind", "database_path": "geoip/GeoLite2-City.mmdb" }
//!   },
//!   "timeout_secs": 5,
//!   "cache": { "enabled": true, "ttl_secs": 86400, "prefix": "geolocation" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main geolocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Driver selection
    #[serde(default)]
    pub drivers: DriversConfig,

    /// Named provider instances
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,

    /// Request timeout for remote backends (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cache-aside settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Retry knobs, accepted for compatibility and passed through unchanged
    #[serde(default)]
    pub retry: RetryConfig,

    /// Base directory for relative database paths
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl GeolocationConfig {
    /// Create a new configuration with defaults and no providers
    pub fn new() -> Self {
        Self {
            drivers: DriversConfig::default(),
            providers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            storage_path: None,
        }
    }

    /// Add a named provider
    pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(name.into(), settings);
        self
    }

    /// Set the default provider name
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.drivers.default = name.into();
        self
    }

    /// Replace the cache settings
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    ///
    /// Unknown `driver` strings are not rejected here; they surface as
    /// `UnsupportedDriver` when the provider is first resolved.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.drivers.default.is_empty() {
            return Err(crate::Error::config("Default driver name cannot be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Timeout must be > 0"));
        }

        self.cache.validate()?;

        for (name, settings) in &self.providers {
            if settings.driver.is_empty() {
                return Err(crate::Error::config(format!(
                    "Provider [{}] has no driver",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriversConfig {
    /// Provider name used when none is given
    #[serde(default = "default_driver")]
    pub default: String,
}

impl Default for DriversConfig {
    fn default() -> Self {
        Self {
            default: default_driver(),
        }
    }
}

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// ipinfo.io
    Ipinfo,
    /// ipapi.co
    Ipapi,
    /// ipgeolocation.io
    Ipgeolocation,
    /// ipstack.com
    Ipstack,
    /// Local MaxMind GeoIP2/GeoLite2 database
    Maxmind,
}

impl BackendKind {
    /// All known backend kinds
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Ipinfo,
        BackendKind::Ipapi,
        BackendKind::Ipgeolocation,
        BackendKind::Ipstack,
        BackendKind::Maxmind,
    ];

    /// Configuration name of the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ipinfo => "ipinfo",
            BackendKind::Ipapi => "ipapi",
            BackendKind::Ipgeolocation => "ipgeolocation",
            BackendKind::Ipstack => "ipstack",
            BackendKind::Maxmind => "maxmind",
        }
    }

    /// Whether the backend is reached over HTTP
    pub fn is_remote(&self) -> bool {
        !matches!(self, BackendKind::Maxmind)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::UnsupportedDriver(s.to_string()))
    }
}

/// Settings for one named provider
///
/// Credentials are kept under the key each backend documents:
/// `access_token` (ipinfo), `api_key` (ipgeolocation, ipapi),
/// `access_key` (ipstack).
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Backend kind name (e.g., "ipinfo", "maxmind")
    pub driver: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub access_key: Option<String>,

    /// Override for the backend's base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Response language (ipgeolocation) and name locale (maxmind)
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub include_hostname: bool,

    #[serde(default)]
    pub include_security: bool,

    #[serde(default)]
    pub include_useragent: bool,

    /// Local database file (maxmind)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// License key for database downloads (maxmind); never used for lookups
    #[serde(default)]
    pub license_key: Option<String>,
}

impl ProviderSettings {
    /// Create settings for a backend kind
    pub fn new(kind: BackendKind) -> Self {
        Self::with_driver(kind.as_str())
    }

    /// Create settings for an arbitrary driver name
    pub fn with_driver(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            access_token: None,
            api_key: None,
            access_key: None,
            base_url: None,
            language: default_language(),
            include_hostname: false,
            include_security: false,
            include_useragent: false,
            database_path: None,
            license_key: None,
        }
    }

    /// Resolve the declared driver to a backend kind
    pub fn backend(&self) -> Result<BackendKind, crate::Error> {
        self.driver.parse()
    }

    /// Set the ipinfo access token
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the ipstack access key
    pub fn access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    /// Point the backend at a different base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the local database path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the response language
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Toggle the optional ipgeolocation response sections
    pub fn includes(mut self, hostname: bool, security: bool, useragent: bool) -> Self {
        self.include_hostname = hostname;
        self.include_security = security;
        self.include_useragent = useragent;
        self
    }

    /// Non-empty secret stored under `field`
    pub fn secret(&self, field: &str) -> Option<&str> {
        let value = match field {
            "access_token" => self.access_token.as_deref(),
            "api_key" => self.api_key.as_deref(),
            "access_key" => self.access_key.as_deref(),
            "license_key" => self.license_key.as_deref(),
            _ => None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

// Credentials never reach logs
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() { "<REDACTED>" } else { "<unset>" }
        }

        f.debug_struct("ProviderSettings")
            .field("driver", &self.driver)
            .field("access_token", &redact(&self.access_token))
            .field("api_key", &redact(&self.api_key))
            .field("access_key", &redact(&self.access_key))
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("include_hostname", &self.include_hostname)
            .field("include_security", &self.include_security)
            .field("include_useragent", &self.include_useragent)
            .field("database_path", &self.database_path)
            .field("license_key", &redact(&self.license_key))
            .finish()
    }
}

/// Cache-aside configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether lookups go through the cache at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Entry lifetime (in seconds)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Key namespace inside a shared store
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Registered store name ("memory", "file"); memory when unset
    #[serde(default)]
    pub store: Option<String>,

    /// Backing file for the file store
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Entry bound for the memory store
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,

    /// Tag-based bulk invalidation
    #[serde(default)]
    pub tags: CacheTagsConfig,
}

impl CacheConfig {
    /// Cache settings with caching turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the entry lifetime
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Enable tagging with the given tag names
    pub fn with_tags(mut self, names: Vec<String>) -> Self {
        self.tags = CacheTagsConfig {
            enabled: true,
            names,
        };
        self
    }

    /// Entry lifetime as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Store name, defaulting to the in-process store
    pub fn store_name(&self) -> &str {
        self.store.as_deref().unwrap_or("memory")
    }

    /// Validate the cache configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.enabled {
            return Ok(());
        }
        if self.prefix.is_empty() {
            return Err(crate::Error::config("Cache prefix cannot be empty"));
        }
        if self.max_capacity == 0 {
            return Err(crate::Error::config("Cache max_capacity must be positive"));
        }
        if self.store_name() == "file" && self.path.is_none() {
            return Err(crate::Error::config("File cache store requires a path"));
        }
        if self.tags.enabled && self.tags.names.is_empty() {
            return Err(crate::Error::config(
                "Cache tags are enabled but no tag names are configured",
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
            prefix: default_prefix(),
            store: None,
            path: None,
            max_capacity: default_max_capacity(),
            tags: CacheTagsConfig::default(),
        }
    }
}

/// Cache tag settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTagsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tag_names")]
    pub names: Vec<String>,
}

impl Default for CacheTagsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            names: default_tag_names(),
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    /// Delay between attempts (in milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_driver() -> String {
    "ipinfo".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_language() -> String {
    "en".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    86400
}

fn default_prefix() -> String {
    "geolocation".to_string()
}

fn default_max_capacity() -> u64 {
    crate::stores::memory::DEFAULT_MAX_CAPACITY
}

fn default_tag_names() -> Vec<String> {
    vec!["geolocation".to_string()]
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    100
}
