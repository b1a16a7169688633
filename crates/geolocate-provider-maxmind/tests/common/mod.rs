//! Fixtures shared by the local database tests
//!
//! `data/GeoIP2-City-Test.mmdb` is rebuilt by `data/build_test_db.py`.
//! It holds four IPv4 networks:
//! - 81.2.69.0/24: London, GB (registered in US)
//! - 89.160.20.128/25: Linköping, SE
//! - 202.196.224.0/20: registered country PH only
//! - 67.43.156.0/24: anonymous proxy without any country

#![allow(dead_code)]

use geolocate_core::config::{BackendKind, CacheConfig, ProviderSettings};
use geolocate_core::traits::{GeoProvider, ProviderContext};
use geolocate_core::{ClientAddress, LookupCache, MemoryCacheStore, ProviderRegistry};
use std::path::PathBuf;
use std::sync::Arc;

pub const LONDON: &str = "81.2.69.142";
pub const LINKOPING: &str = "89.160.20.129";
pub const REGISTERED_ONLY: &str = "202.196.230.5";
pub const NO_COUNTRY: &str = "67.43.156.1";
pub const UNLISTED: &str = "8.8.8.8";

pub fn database_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/GeoIP2-City-Test.mmdb")
}

/// Context over the test database with a fresh memory cache
pub fn database_context(language: &str) -> (ProviderContext, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    let settings = ProviderSettings::new(BackendKind::Maxmind)
        .database_path(database_path())
        .language(language);
    let context = ProviderContext::new("maxmind", settings)
        .with_cache(LookupCache::new(store.clone(), CacheConfig::default()));
    (context, store)
}

/// Same context, answering omitted addresses with `client`
pub fn database_context_for(client: Arc<dyn ClientAddress>) -> ProviderContext {
    database_context("en").0.with_client_address(client)
}

/// Build an adapter through the crate's registered factory
pub fn build(context: &ProviderContext) -> geolocate_core::Result<Box<dyn GeoProvider>> {
    let registry = ProviderRegistry::new();
    geolocate_provider_maxmind::register(&registry);
    registry.create_provider(context)
}
