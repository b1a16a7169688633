// # Remote Geolocation Backends
//
// This crate provides the four HTTP-based backends:
//
// | Backend | Module | Credential |
// |---|---|---|
// | ipinfo.io | `ipinfo` | `access_token` (required) |
// | ipapi.co | `ipapi` | `api_key` (optional) |
// | ipgeolocation.io | `ipgeolocation` | `api_key` (required) |
// | ipstack.com | `ipstack` | `access_key` (required) |
//
// ## Behavior shared by all four
//
// - one GET per cache miss, bounded by the configured timeout
// - missing credentials fail at construction, before any request
// - non-200 statuses and embedded error bodies become `Error::Provider`
// - network failures become `Error::Transport`
// - responses without an IP or country code become `Error::IncompleteData`
//
// ## Security
//
// Credentials never appear in logs or `Debug` output.

mod fields;
mod transport;

pub mod ipapi;
pub mod ipgeolocation;
pub mod ipinfo;
pub mod ipstack;

pub use ipapi::{IpApiFactory, IpApiProvider};
pub use ipgeolocation::{IpGeolocationFactory, IpGeolocationProvider};
pub use ipinfo::{IpInfoFactory, IpInfoProvider};
pub use ipstack::{IpStackFactory, IpStackProvider};

use geolocate_core::ProviderRegistry;
use geolocate_core::config::BackendKind;

/// Register all remote backends with a registry
///
/// # Example
///
/// ```rust
/// use geolocate_core::ProviderRegistry;
/// use geolocate_core::config::BackendKind;
///
/// let registry = ProviderRegistry::new();
/// geolocate_provider_http::register(&registry);
/// assert!(registry.has_provider(BackendKind::Ipstack));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(BackendKind::Ipinfo, Box::new(IpInfoFactory));
    registry.register_provider(BackendKind::Ipapi, Box::new(IpApiFactory));
    registry.register_provider(BackendKind::Ipgeolocation, Box::new(IpGeolocationFactory));
    registry.register_provider(BackendKind::Ipstack, Box::new(IpStackFactory));
}
