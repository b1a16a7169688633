//! Core traits for the geolocate system
//!
//! - [`GeoProvider`]: Resolve an IP address to a canonical record
//! - [`ProviderFactory`]: Build providers from configuration
//! - [`CacheStore`]: Storage behind the cache-aside helper

pub mod cache_store;
pub mod provider;

pub use cache_store::{CacheEntry, CacheStore, CacheStoreFactory};
pub use provider::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory, resolve_path};
