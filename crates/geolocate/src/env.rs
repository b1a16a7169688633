//! Configuration from environment variables
//!
//! | Variable | Default |
//! |---|---|
//! | `GEOLOCATION_DRIVER` | `ipinfo` |
//! | `GEOLOCATION_TIMEOUT` | `5` (seconds) |
//! | `GEOLOCATION_CACHE_ENABLED` | `true` |
//! | `GEOLOCATION_CACHE_TTL` | `86400` (seconds) |
//! | `GEOLOCATION_CACHE_PREFIX` | `geolocation` |
//! | `GEOLOCATION_CACHE_STORE` | `memory` |
//! | `GEOLOCATION_CACHE_PATH` | unset |
//! | `GEOLOCATION_CACHE_TAGS_ENABLED` | `false` |
//! | `GEOLOCATION_CACHE_MAX_CAPACITY` | `10000` (memory store entries) |
//! | `GEOLOCATION_RETRY_ATTEMPTS` | `2` |
//! | `GEOLOCATION_RETRY_DELAY` | `100` (milliseconds) |
//! | `GEOLOCATION_STORAGE_PATH` | unset |
//!
//! Provider credentials:
//! `GEOLOCATION_IPINFO_ACCESS_TOKEN`, `GEOLOCATION_IPAPI_KEY`,
//! `GEOLOCATION_IPGEOLOCATION_API_KEY`, `GEOLOCATION_IPSTACK_ACCESS_KEY`,
//! `MAXMIND_DATABASE_PATH` (default `geoip/GeoLite2-City.mmdb` under the
//! storage path) and `MAXMIND_LICENSE_KEY`.
//!
//! ipgeolocation extras: `GEOLOCATION_IPGEOLOCATION_LANGUAGE`,
//! `GEOLOCATION_IPGEOLOCATION_INCLUDE_HOSTNAME`,
//! `GEOLOCATION_IPGEOLOCATION_INCLUDE_SECURITY`,
//! `GEOLOCATION_IPGEOLOCATION_INCLUDE_USERAGENT`.
//!
//! Empty values count as unset. Every backend is registered under its
//! conventional name, so `GEOLOCATION_DRIVER=maxmind` works without
//! further setup.

use anyhow::{Context, Result, bail};
use geolocate_core::config::{BackendKind, CacheConfig, GeolocationConfig, ProviderSettings};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_MAXMIND_DATABASE: &str = "geoip/GeoLite2-City.mmdb";

/// Read configuration from the process environment
pub fn config_from_env() -> Result<GeolocationConfig> {
    config_from_vars(|key| env::var(key).ok())
}

/// Read configuration through `var`, which returns a variable's value
pub fn config_from_vars<F>(var: F) -> Result<GeolocationConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars(var);
    let mut config = GeolocationConfig::new();

    if let Some(driver) = vars.text("GEOLOCATION_DRIVER") {
        config.drivers.default = driver;
    }
    if let Some(timeout) = vars.parsed("GEOLOCATION_TIMEOUT")? {
        config.timeout_secs = timeout;
    }
    if let Some(attempts) = vars.parsed("GEOLOCATION_RETRY_ATTEMPTS")? {
        config.retry.attempts = attempts;
    }
    if let Some(delay) = vars.parsed("GEOLOCATION_RETRY_DELAY")? {
        config.retry.delay_ms = delay;
    }
    config.storage_path = vars.text("GEOLOCATION_STORAGE_PATH").map(PathBuf::from);
    config.cache = cache_from_vars(&vars)?;

    for (kind, settings) in provider_table(&vars)? {
        config.providers.insert(kind.as_str().to_string(), settings);
    }

    config.validate()?;
    Ok(config)
}

fn cache_from_vars<F>(vars: &Vars<F>) -> Result<CacheConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cache = CacheConfig::default();

    if let Some(enabled) = vars.flag("GEOLOCATION_CACHE_ENABLED")? {
        cache.enabled = enabled;
    }
    if let Some(ttl) = vars.parsed("GEOLOCATION_CACHE_TTL")? {
        cache.ttl_secs = ttl;
    }
    if let Some(prefix) = vars.text("GEOLOCATION_CACHE_PREFIX") {
        cache.prefix = prefix;
    }
    cache.store = vars.text("GEOLOCATION_CACHE_STORE");
    cache.path = vars.text("GEOLOCATION_CACHE_PATH").map(PathBuf::from);
    if let Some(max_capacity) = vars.parsed("GEOLOCATION_CACHE_MAX_CAPACITY")? {
        cache.max_capacity = max_capacity;
    }
    if let Some(tags) = vars.flag("GEOLOCATION_CACHE_TAGS_ENABLED")? {
        cache.tags.enabled = tags;
    }

    Ok(cache)
}

fn provider_table<F>(vars: &Vars<F>) -> Result<Vec<(BackendKind, ProviderSettings)>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut ipinfo = ProviderSettings::new(BackendKind::Ipinfo);
    ipinfo.access_token = vars.text("GEOLOCATION_IPINFO_ACCESS_TOKEN");

    let mut ipapi = ProviderSettings::new(BackendKind::Ipapi);
    ipapi.api_key = vars.text("GEOLOCATION_IPAPI_KEY");

    let mut ipgeolocation = ProviderSettings::new(BackendKind::Ipgeolocation);
    ipgeolocation.api_key = vars.text("GEOLOCATION_IPGEOLOCATION_API_KEY");
    if let Some(language) = vars.text("GEOLOCATION_IPGEOLOCATION_LANGUAGE") {
        ipgeolocation.language = language;
    }
    ipgeolocation.include_hostname = vars
        .flag("GEOLOCATION_IPGEOLOCATION_INCLUDE_HOSTNAME")?
        .unwrap_or(false);
    ipgeolocation.include_security = vars
        .flag("GEOLOCATION_IPGEOLOCATION_INCLUDE_SECURITY")?
        .unwrap_or(false);
    ipgeolocation.include_useragent = vars
        .flag("GEOLOCATION_IPGEOLOCATION_INCLUDE_USERAGENT")?
        .unwrap_or(false);

    let mut ipstack = ProviderSettings::new(BackendKind::Ipstack);
    ipstack.access_key = vars.text("GEOLOCATION_IPSTACK_ACCESS_KEY");

    let mut maxmind = ProviderSettings::new(BackendKind::Maxmind).database_path(
        vars.text("MAXMIND_DATABASE_PATH")
            .unwrap_or_else(|| DEFAULT_MAXMIND_DATABASE.to_string()),
    );
    maxmind.license_key = vars.text("MAXMIND_LICENSE_KEY");

    Ok(vec![
        (BackendKind::Ipinfo, ipinfo),
        (BackendKind::Ipapi, ipapi),
        (BackendKind::Ipgeolocation, ipgeolocation),
        (BackendKind::Ipstack, ipstack),
        (BackendKind::Maxmind, maxmind),
    ])
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.text(key)
            .map(|value| {
                value
                    .parse()
                    .with_context(|| format!("{} is not a valid number: {}", key, value))
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.text(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => bail!("{} must be true or false, got: {}", key, value),
        }
    }
}
