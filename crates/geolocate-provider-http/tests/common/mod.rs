//! Fixtures shared by the remote adapter tests

#![allow(dead_code)]

use geolocate_core::config::{BackendKind, CacheConfig, ProviderSettings};
use geolocate_core::traits::{GeoProvider, ProviderContext, ProviderFactory};
use geolocate_core::{LookupCache, MemoryCacheStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Context pointing `kind` at a mock server, with a fresh memory cache
pub fn mock_context(kind: BackendKind, base_url: &str, secret: Option<&str>) -> ProviderContext {
    let mut settings = ProviderSettings::new(kind).base_url(base_url);
    if let Some(secret) = secret {
        settings = match kind {
            BackendKind::Ipinfo => settings.access_token(secret),
            BackendKind::Ipstack => settings.access_key(secret),
            _ => settings.api_key(secret),
        };
    }

    ProviderContext::new(kind.as_str(), settings)
        .with_timeout(Duration::from_secs(2))
        .with_cache(LookupCache::new(
            Arc::new(MemoryCacheStore::new()),
            CacheConfig::default(),
        ))
}

/// Build an adapter through the crate's registered factory
pub fn build(context: &ProviderContext) -> geolocate_core::Result<Box<dyn GeoProvider>> {
    let registry = geolocate_core::ProviderRegistry::new();
    geolocate_provider_http::register(&registry);
    registry.create_provider(context)
}

/// ipinfo.io body for Google DNS
pub fn ipinfo_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "hostname": "dns.google",
        "city": "Mountain View",
        "region": "California",
        "country": "US",
        "loc": "37.4056,-122.0775",
        "org": "AS15169 Google LLC",
        "postal": "94043",
        "timezone": "America/Los_Angeles"
    })
}

/// ipapi.co body for Google DNS
pub fn ipapi_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "city": "Mountain View",
        "region": "California",
        "country_code": "US",
        "latitude": 37.42301,
        "longitude": -122.083352,
        "timezone": "America/Los_Angeles",
        "utc_offset": "-0800",
        "currency": "USD",
        "currency_name": "Dollar",
        "asn": "AS15169",
        "org": "GOOGLE"
    })
}

/// ipgeolocation.io body for Google DNS
pub fn ipgeolocation_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "country_code2": "US",
        "state_prov": "California",
        "city": "Mountain View",
        "latitude": "37.42240",
        "longitude": "-122.08421",
        "isp": "Google LLC",
        "time_zone": {"name": "America/Los_Angeles", "offset": -8}
    })
}

/// ipstack.com body for Google DNS
pub fn ipstack_body() -> Value {
    json!({
        "ip": "8.8.8.8",
        "country_code": "US",
        "region_name": "California",
        "city": "Mountain View",
        "latitude": 37.38605,
        "longitude": -122.08385,
        "time_zone": {"id": "America/Los_Angeles", "gmt_offset": -28800}
    })
}

/// Factory handle for tests that bypass the registry
pub fn factory(kind: BackendKind) -> Box<dyn ProviderFactory> {
    match kind {
        BackendKind::Ipinfo => Box::new(geolocate_provider_http::IpInfoFactory),
        BackendKind::Ipapi => Box::new(geolocate_provider_http::IpApiFactory),
        BackendKind::Ipgeolocation => Box::new(geolocate_provider_http::IpGeolocationFactory),
        _ => Box::new(geolocate_provider_http::IpStackFactory),
    }
}
