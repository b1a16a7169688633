// # MaxMind Local Database Backend
//
// Resolves addresses against a GeoIP2/GeoLite2 `.mmdb` file.
//
// ## Construction
//
// The database is opened eagerly by the factory. A path that does not
// exist, cannot be read, or does not hold a valid MaxMind database fails
// with `Error::Config` before any lookup is attempted. Relative paths
// are resolved against `storage_path` by the manager.
//
// ## Lookups
//
// - no network call and no credential
// - the whole file is read into memory once; lookups are in-memory reads
// - an address missing from the dataset is `Error::AddressNotFound`
// - there is no "self" endpoint: an omitted address needs a
//   `ClientAddress` collaborator

mod record;

use async_trait::async_trait;
use geolocate_core::config::BackendKind;
use geolocate_core::traits::{GeoProvider, LookupFlow, ProviderContext, ProviderFactory};
use geolocate_core::{Error, GeolocationDetails, LookupTarget, ProviderRegistry, RawRecord, Result};
use maxminddb::Reader;
use std::fs::File;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use record::GeoRecord;

/// MaxMind database adapter
pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
    path: PathBuf,
    locale: String,
    flow: LookupFlow,
}

impl MaxMindProvider {
    /// Open the configured database
    ///
    /// # Returns
    ///
    /// - `Ok(MaxMindProvider)`: database opened and validated
    /// - `Err(Error::Config)`: no path configured, file missing,
    ///   unreadable or not a MaxMind database
    pub fn new(context: &ProviderContext) -> Result<Self> {
        let path = context.database_path().ok_or_else(|| {
            Error::config(format!(
                "Provider [{}] needs database_path for the MaxMind driver",
                context.name
            ))
        })?;

        let reader = open_database(path)?;
        tracing::info!(
            provider = %context.name,
            path = %path.display(),
            database = %reader.metadata.database_type,
            "MaxMind database opened"
        );

        Ok(Self {
            reader: Arc::new(reader),
            path: path.to_path_buf(),
            locale: context.settings.language.trim().to_string(),
            flow: context.lookup_flow(),
        })
    }

    /// Database file in use
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, target: LookupTarget) -> Result<RawRecord> {
        let ip = target.address().ok_or_else(|| {
            Error::provider(
                self.flow.name(),
                "MaxMind lookups need an IP address and no client address is available",
            )
        })?;

        let record = self.decode(ip)?.ok_or_else(|| Error::address_not_found(ip.to_string()))?;
        tracing::trace!(provider = self.flow.name(), %ip, "MaxMind record decoded");

        let raw = record.into_raw(ip, &self.locale);
        if !raw.contains_key("countryCode") {
            return Err(Error::incomplete(
                self.flow.name(),
                vec!["countryCode".to_string()],
            ));
        }
        Ok(raw)
    }

    fn decode(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        let database_error =
            |e: maxminddb::MaxMindDbError| Error::provider(self.flow.name(), format!("MaxMind database error: {}", e));

        let result = self.reader.lookup(ip).map_err(database_error)?;
        result.decode::<GeoRecord>().map_err(database_error)
    }
}

/// Validate and open a database file
fn open_database(path: &Path) -> Result<Reader<Vec<u8>>> {
    if !path.exists() {
        return Err(Error::config(format!(
            "MaxMind database not found at: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(Error::config(format!(
            "MaxMind database path is not a file: {}",
            path.display()
        )));
    }
    File::open(path).map_err(|e| {
        Error::config(format!(
            "MaxMind database is not readable: {} ({})",
            path.display(),
            e
        ))
    })?;

    Reader::open_readfile(path).map_err(|e| {
        Error::config(format!(
            "Invalid MaxMind database at {}: {}",
            path.display(),
            e
        ))
    })
}

#[async_trait]
impl GeoProvider for MaxMindProvider {
    async fn lookup(&self, ip: Option<&str>) -> Result<GeolocationDetails> {
        self.flow
            .run(ip, |target| async move { self.read(target) })
            .await
    }

    fn provider_name(&self) -> &str {
        self.flow.name()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Maxmind
    }
}

impl std::fmt::Debug for MaxMindProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindProvider")
            .field("path", &self.path)
            .field("locale", &self.locale)
            .field("flow", &self.flow)
            .finish()
    }
}

/// Factory for MaxMind adapters
pub struct MaxMindFactory;

impl ProviderFactory for MaxMindFactory {
    fn create(&self, context: &ProviderContext) -> Result<Box<dyn GeoProvider>> {
        Ok(Box::new(MaxMindProvider::new(context)?))
    }
}

/// Register the MaxMind backend with a registry
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(BackendKind::Maxmind, Box::new(MaxMindFactory));
}
