//! Contract Test: Provider Resolution
//!
//! Constraints verified:
//! - The default provider is built when the manager is built
//! - Each name is constructed once and then memoized
//! - Unknown names are `UndefinedDriver`, unknown backends `UnsupportedDriver`
//! - The manager forwards `lookup` to the default provider
//! - `forget_cached` keys omitted addresses the way `lookup` does
//! - Relative database paths resolve against `storage_path`

mod common;

use common::*;
use geolocate_core::config::{BackendKind, CacheConfig, ProviderSettings};
use geolocate_core::{
    Error, GeoProvider, GeolocationManager, LookupCache, MemoryCacheStore, ProviderRegistry,
    StaticClientAddress,
};
use std::path::PathBuf;
use std::sync::Arc;

fn registry_with(counters: &ScriptCounters) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    geolocate_core::stores::register(&registry);
    registry.register_provider(
        BackendKind::Ipinfo,
        Box::new(ScriptedFactory::new(BackendKind::Ipinfo, counters)),
    );
    registry.register_provider(
        BackendKind::Ipapi,
        Box::new(ScriptedFactory::new(BackendKind::Ipapi, counters)),
    );
    Arc::new(registry)
}

#[tokio::test]
async fn default_provider_is_resolved_at_build_time() {
    let counters = ScriptCounters::default();
    let manager = GeolocationManager::builder(two_provider_config(), registry_with(&counters))
        .build()
        .await
        .expect("manager builds");

    assert_eq!(counters.creates(), 1);
    assert!(manager.is_resolved("primary"));
    assert!(!manager.is_resolved("secondary"));
    assert_eq!(manager.default_driver(), "primary");
}

#[tokio::test]
async fn named_drivers_are_memoized() {
    let counters = ScriptCounters::default();
    let manager = GeolocationManager::builder(two_provider_config(), registry_with(&counters))
        .build()
        .await
        .unwrap();

    let a = manager.driver(Some("secondary")).unwrap();
    let b = manager.driver(Some("secondary")).unwrap();
    let default = manager.driver(None).unwrap();
    let primary = manager.driver(Some("primary")).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&default, &primary));
    assert_eq!(a.backend(), BackendKind::Ipapi);
    assert_eq!(counters.creates(), 2);
}

#[tokio::test]
async fn unknown_name_is_undefined_driver() {
    let counters = ScriptCounters::default();
    let manager = GeolocationManager::builder(two_provider_config(), registry_with(&counters))
        .build()
        .await
        .unwrap();

    match manager.driver(Some("nope")) {
        Err(Error::UndefinedDriver(name)) => assert_eq!(name, "nope"),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected UndefinedDriver"),
    }
}

#[tokio::test]
async fn backend_without_factory_is_unsupported() {
    let counters = ScriptCounters::default();
    let config = two_provider_config()
        .with_provider(
            "stack",
            ProviderSettings::new(BackendKind::Ipstack).api_key("k"),
        )
        .with_provider("mystery", ProviderSettings::with_driver("geoip9"));

    let manager = GeolocationManager::builder(config, registry_with(&counters))
        .build()
        .await
        .unwrap();

    assert!(matches!(
        manager.driver(Some("stack")),
        Err(Error::UnsupportedDriver(name)) if name == "ipstack"
    ));
    assert!(matches!(
        manager.driver(Some("mystery")),
        Err(Error::UnsupportedDriver(name)) if name == "geoip9"
    ));
}

#[tokio::test]
async fn broken_default_fails_the_build() {
    let counters = ScriptCounters::default();
    let config = two_provider_config()
        .with_provider("primary", ProviderSettings::new(BackendKind::Ipinfo));

    let result = GeolocationManager::builder(config, registry_with(&counters))
        .build()
        .await;

    assert!(matches!(result, Err(Error::MissingCredential { .. })));
}

#[tokio::test]
async fn undefined_default_fails_the_build() {
    let counters = ScriptCounters::default();
    let config = two_provider_config().with_default("missing");

    let result = GeolocationManager::builder(config, registry_with(&counters))
        .build()
        .await;

    assert!(matches!(result, Err(Error::UndefinedDriver(_))));
    assert_eq!(counters.creates(), 0);
}

#[tokio::test]
async fn manager_forwards_lookup_to_default() {
    let counters = ScriptCounters::default();
    let manager = GeolocationManager::builder(two_provider_config(), registry_with(&counters))
        .build()
        .await
        .unwrap();

    let details = manager.lookup(Some("8.8.8.8")).await.unwrap();

    assert_eq!(details.ip(), Some("8.8.8.8"));
    assert_eq!(details.country_code(), Some("US"));
    assert_eq!(manager.provider_name(), "primary");
    assert_eq!(manager.backend(), BackendKind::Ipinfo);
    assert_eq!(counters.fetches(), 1);
}

#[tokio::test]
async fn relative_database_path_uses_storage_path() {
    let counters = ScriptCounters::default();
    let mut config = two_provider_config().with_provider(
        "local",
        ProviderSettings::new(BackendKind::Ipapi)
            .api_key("k")
            .database_path("geoip/GeoLite2-City.mmdb"),
    );
    config.storage_path = Some(PathBuf::from("/srv/app/storage"));

    let manager = GeolocationManager::builder(config, registry_with(&counters))
        .build()
        .await
        .unwrap();
    manager.driver(Some("local")).unwrap();

    assert_eq!(
        counters.last_database_path.lock().unwrap().clone(),
        Some(PathBuf::from("/srv/app/storage/geoip/GeoLite2-City.mmdb"))
    );
}

#[tokio::test]
async fn concurrent_first_use_yields_working_providers() {
    let counters = ScriptCounters::default();
    let manager = Arc::new(
        GeolocationManager::builder(two_provider_config(), registry_with(&counters))
            .build()
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager.driver(Some("secondary")).map(|p| p.backend())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), BackendKind::Ipapi);
    }
    assert!(manager.is_resolved("secondary"));
}

#[tokio::test]
async fn forget_and_flush_go_through_shared_cache() {
    let counters = ScriptCounters::default();
    let config = two_provider_config()
        .with_cache(CacheConfig::default().with_tags(vec!["geolocation".to_string()]));
    let store = Arc::new(MemoryCacheStore::new());

    let manager = GeolocationManager::builder(config, registry_with(&counters))
        .cache_store(store.clone())
        .build()
        .await
        .unwrap();

    manager.lookup(Some("8.8.8.8")).await.unwrap();
    manager.lookup(Some("8.8.8.8")).await.unwrap();
    assert_eq!(counters.fetches(), 1);

    assert!(manager.forget_cached(None, Some("8.8.8.8")).await.unwrap());
    manager.lookup(Some("8.8.8.8")).await.unwrap();
    assert_eq!(counters.fetches(), 2);

    assert!(manager.flush_cache().await.unwrap());
    assert!(store.is_empty().await);

    assert!(matches!(
        manager.forget_cached(Some("nope"), None).await,
        Err(Error::UndefinedDriver(_))
    ));
}

#[tokio::test]
async fn forget_without_address_targets_client_address() {
    let counters = ScriptCounters::default();
    let client = Arc::new(StaticClientAddress("203.0.113.7".parse().unwrap()));

    let manager = GeolocationManager::builder(two_provider_config(), registry_with(&counters))
        .cache_store(Arc::new(MemoryCacheStore::new()))
        .client_address(client)
        .build()
        .await
        .unwrap();

    let details = manager.lookup(None).await.unwrap();
    assert_eq!(details.ip(), Some("203.0.113.7"));
    assert_eq!(counters.fetches(), 1);

    // Same subject as the lookup, so the entry is found
    assert!(manager.forget_cached(None, None).await.unwrap());
    manager.lookup(None).await.unwrap();
    assert_eq!(counters.fetches(), 2);
}

#[test]
fn explicit_cache_constructor_is_synchronous() {
    let counters = ScriptCounters::default();
    let manager = GeolocationManager::new(
        two_provider_config(),
        registry_with(&counters),
        LookupCache::disabled(),
    )
    .unwrap();

    let details = tokio_test::block_on(manager.lookup(Some("1.1.1.1"))).unwrap();
    assert_eq!(details.ip(), Some("1.1.1.1"));
    assert!(!manager.cache().is_enabled());
}
