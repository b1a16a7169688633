//! Minimal embedding example for geolocate
//!
//! Builds a manager in code instead of from the environment, plugs in the
//! caller's address and localized country names, then resolves addresses
//! given on the command line (or the caller's own address when none are).
//!
//! ```text
//! RUST_LOG=debug cargo run -p embedded_usage -- 8.8.8.8 1.1.1.1
//! ```

use geolocate::config::{BackendKind, CacheConfig, GeolocationConfig, ProviderSettings};
use geolocate::{
    CountryNames, GeoProvider, GeolocationDetails, GeolocationManager, StaticClientAddress,
};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Country names for a German-language front end
struct GermanCountryNames;

impl CountryNames for GermanCountryNames {
    fn country_name(&self, code: &str) -> Option<String> {
        let name = match code {
            "DE" => "Deutschland",
            "AT" => "Österreich",
            "CH" => "Schweiz",
            "US" => "Vereinigte Staaten",
            "AU" => "Australien",
            _ => return None,
        };
        Some(name.to_string())
    }
}

fn print_details(details: &GeolocationDetails) {
    println!("  ip:        {}", details.ip().unwrap_or("-"));
    println!("  address:   {}", details.full_address());
    println!("  timezone:  {}", details.timezone().unwrap_or("-"));
    if let Some(offset) = details.timezone_offset() {
        println!("  offset:    {:+}h", offset);
    }
    if let Some(asn) = details.asn() {
        println!("  network:   {} {}", asn, details.asn_name().unwrap_or(""));
    }
    if let Some(link) = details.openstreetmap_link() {
        println!("  map:       {}", link);
    }
    if let Some(flag) = details.country_flag() {
        println!("  flag:      {}", flag);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = match std::env::var("RUST_LOG").unwrap_or_default().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("=== Embedded geolocate Example ===\n");

    // ipapi.co works without a key at low volume
    let config = GeolocationConfig::new()
        .with_provider("public", ProviderSettings::new(BackendKind::Ipapi))
        .with_default("public")
        .with_cache(CacheConfig::default().with_ttl_secs(600));

    // A web application would read this from the incoming request
    let client_ip: IpAddr = "8.8.4.4".parse()?;

    let manager = GeolocationManager::builder(config, Arc::new(geolocate::builtin_registry()))
        .client_address(Arc::new(StaticClientAddress(client_ip)))
        .country_names(Arc::new(GermanCountryNames))
        .build()
        .await?;
    info!(default = manager.default_driver(), "Manager ready");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let targets: Vec<Option<&str>> = if args.is_empty() {
        vec![None]
    } else {
        args.iter().map(|ip| Some(ip.as_str())).collect()
    };

    for target in targets {
        println!("{}:", target.unwrap_or("(caller)"));
        match manager.lookup(target).await {
            Ok(details) => print_details(&details),
            Err(e) => warn!("Lookup failed: {}", e),
        }
        println!();
    }

    // Repeat lookups are answered from the cache
    if let Err(e) = manager.lookup(None).await {
        warn!("Cached lookup failed: {}", e);
    }

    Ok(())
}
