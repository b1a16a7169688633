//! Test doubles shared by the core contract tests
//!
//! The doubles follow the same lookup contract the real adapters do
//! (validate, resolve target, go through `LookupCache`), but their fetch
//! is scripted and counted.

#![allow(dead_code)]

use async_trait::async_trait;
use geolocate_core::config::{BackendKind, CacheConfig, GeolocationConfig, ProviderSettings};
use geolocate_core::error::{Error, Result};
use geolocate_core::traits::{CacheStore, GeoProvider, ProviderContext, ProviderFactory};
use geolocate_core::{
    ClientAddress, GeolocationDetails, LookupCache, LookupTarget, MemoryCacheStore, RawRecord,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned backend answer for an address
pub fn canned_record(ip: &str) -> RawRecord {
    let value = json!({
        "ip": ip,
        "city": "Mountain View",
        "region": "California",
        "country": "US",
        "latitude": 37.386,
        "longitude": -122.084,
        "timezone": "America/Los_Angeles",
        "asn": "AS15169"
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// A provider whose backend call is counted and optionally fails
pub struct ScriptedProvider {
    name: String,
    kind: BackendKind,
    cache: LookupCache,
    client: Option<Arc<dyn ClientAddress>>,
    fetch_count: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl ScriptedProvider {
    pub fn new(context: &ProviderContext, kind: BackendKind, counters: &ScriptCounters) -> Self {
        Self {
            name: context.name.clone(),
            kind,
            cache: context.cache.clone(),
            client: context.client_address.clone(),
            fetch_count: counters.fetches.clone(),
            failing: counters.failing.clone(),
        }
    }

    async fn fetch(&self, target: LookupTarget) -> Result<RawRecord> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::provider(
                &self.name,
                "Rate limit exceeded - too many requests",
            ));
        }
        let ip = match target {
            LookupTarget::Address(ip) => ip.to_string(),
            LookupTarget::Current => "198.51.100.1".to_string(),
        };
        Ok(canned_record(&ip))
    }
}

#[async_trait]
impl GeoProvider for ScriptedProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        let target = LookupTarget::resolve(ip, self.client.as_deref())?;
        let raw = self
            .cache
            .remember(&self.name, &target.cache_subject(), || self.fetch(target))
            .await?;
        Ok(GeolocationDetails::from_raw(&raw))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> BackendKind {
        self.kind
    }
}

/// Counters shared between a factory, its providers and the test
#[derive(Clone, Default)]
pub struct ScriptCounters {
    pub creates: Arc<AtomicUsize>,
    pub fetches: Arc<AtomicUsize>,
    pub failing: Arc<AtomicBool>,
    pub last_database_path: Arc<Mutex<Option<PathBuf>>>,
}

impl ScriptCounters {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

/// Factory that builds `ScriptedProvider`s and requires an `api_key`
pub struct ScriptedFactory {
    kind: BackendKind,
    counters: ScriptCounters,
}

impl ScriptedFactory {
    pub fn new(kind: BackendKind, counters: &ScriptCounters) -> Self {
        Self {
            kind,
            counters: counters.clone(),
        }
    }
}

impl ProviderFactory for ScriptedFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        context.require_secret("api_key")?;
        *self.counters.last_database_path.lock().unwrap() =
            context.database_path().map(|p| p.to_path_buf());
        Ok(Box::new(ScriptedProvider::new(
            context,
            self.kind,
            &self.counters,
        )))
    }
}

/// Cache store wrapper that counts calls and can be switched to fail
#[derive(Default)]
pub struct CountingCacheStore {
    inner: MemoryCacheStore,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub broken: AtomicBool,
}

impl CountingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        let store = Self::default();
        store.broken.store(true, Ordering::SeqCst);
        store
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            Err(Error::cache("store unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for CountingCacheStore {
    async fn get(&self, key: &str) -> Result<Option<RawRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        value: &RawRecord,
        ttl: Duration,
        tags: &[String],
    ) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.put(key, value, ttl, tags).await
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.forget(key).await
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<bool> {
        self.check()?;
        self.inner.flush_tags(tags).await
    }

    fn supports_tags(&self) -> bool {
        true
    }
}

/// Config with two keyed providers ("primary" ipinfo, "secondary" ipapi)
pub fn two_provider_config() -> GeolocationConfig {
    GeolocationConfig::new()
        .with_default("primary")
        .with_provider(
            "primary",
            ProviderSettings::new(BackendKind::Ipinfo).api_key("k1"),
        )
        .with_provider(
            "secondary",
            ProviderSettings::new(BackendKind::Ipapi).api_key("k2"),
        )
        .with_cache(CacheConfig::default())
}
