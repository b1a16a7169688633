// # geolocate-core
//
// Core library for resolving IP addresses to location and network data.
//
// ## Architecture Overview
//
// - **GeolocationDetails**: the canonical, immutable record every backend
//   is normalized into
// - **GeoProvider**: trait implemented by each backend adapter
// - **LookupCache**: cache-aside helper keyed by provider and address
// - **CacheStore**: storage behind the cache (memory and file built in)
// - **ProviderRegistry**: maps backend kinds to factories
// - **GeolocationManager**: resolves provider names and memoizes adapters
//
// Backend adapters live in their own crates (`geolocate-provider-http`,
// `geolocate-provider-maxmind`) and register themselves with the registry.
// This crate performs no network I/O.

pub mod address;
pub mod cache;
pub mod config;
pub mod countries;
pub mod error;
pub mod manager;
pub mod record;
pub mod registry;
pub mod stores;
pub mod timezone;
pub mod traits;

// Re-export core types for convenience
pub use address::{ClientAddress, LookupTarget, StaticClientAddress};
pub use cache::LookupCache;
pub use config::{BackendKind, CacheConfig, GeolocationConfig, ProviderSettings};
pub use countries::CountryNames;
pub use error::{Error, Result};
pub use manager::{GeolocationManager, GeolocationManagerBuilder};
pub use record::{GeolocationDetails, RawRecord};
pub use registry::ProviderRegistry;
pub use stores::{FileCacheStore, MemoryCacheStore};
pub use traits::{CacheStore, GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
