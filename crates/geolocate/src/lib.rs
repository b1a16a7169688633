// # geolocate
//
// Ready-to-use entry point for the geolocate crates.
//
// ## Usage
//
// ```rust,no_run
// # async fn run() -> anyhow::Result<()> {
// use geolocate::GeoProvider;
//
// let manager = geolocate::manager_from_env().await?;
// let details = manager.lookup(Some("8.8.8.8")).await?;
// println!("{:?}", details.country());
// # Ok(())
// # }
// ```
//
// ## Features
//
// - `http` (default): ipinfo, ipapi, ipgeolocation and ipstack backends
// - `maxmind` (default): local MaxMind database backend
//
// The memory and file cache stores are always registered.

pub mod env;

pub use geolocate_core::*;

#[cfg(feature = "http")]
pub use geolocate_provider_http as http;

#[cfg(feature = "maxmind")]
pub use geolocate_provider_maxmind as maxmind;

use std::sync::Arc;

/// Registry with every backend compiled into this build
pub fn builtin_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    geolocate_core::stores::register(&registry);

    #[cfg(feature = "http")]
    geolocate_provider_http::register(&registry);

    #[cfg(feature = "maxmind")]
    geolocate_provider_maxmind::register(&registry);

    tracing::debug!(
        providers = ?registry.list_providers(),
        stores = ?registry.list_cache_stores(),
        "Built-in registry ready"
    );
    registry
}

/// Build a manager for `config` over the built-in registry
pub async fn build_manager(config: GeolocationConfig) -> Result<GeolocationManager> {
    GeolocationManager::builder(config, Arc::new(builtin_registry()))
        .build()
        .await
}

/// Load configuration from `GEOLOCATION_*` variables and build a manager
pub async fn manager_from_env() -> anyhow::Result<GeolocationManager> {
    let config = env::config_from_env()?;
    tracing::info!(default = %config.drivers.default, "Geolocation configuration loaded");
    Ok(build_manager(config).await?)
}
