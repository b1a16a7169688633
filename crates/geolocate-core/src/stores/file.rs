// # File Cache Store
//
// JSON-file implementation of CacheStore that survives restarts.
//
// ## Durability
//
// - Atomic writes: the whole file is written to `.tmp`, then renamed
// - Backup: the previous file is copied to `.backup` before each rename
// - Recovery: a corrupt main file is replaced by the backup; if both are
//   unreadable the store starts empty
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "geolocation:ipinfo:5f1b...": {
//       "value": { "ip": "8.8.8.8", "countryCode": "US" },
//       "expires_at": "2025-01-09T12:00:00Z",
//       "tags": []
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::record::RawRecord;
use crate::traits::{CacheEntry, CacheStore, CacheStoreFactory};

/// Cache file format version
const CACHE_FILE_VERSION: &str = "1.0";

/// File-backed cache store
#[derive(Debug)]
pub struct FileCacheStore {
    path: PathBuf,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CacheFileFormat {
    version: String,
    entries: HashMap<String, CacheEntry>,
}

impl FileCacheStore {
    /// Open or create a file cache store
    ///
    /// Parent directories are created. Expired entries are dropped on load.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create cache directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut entries = Self::load_with_recovery(&path).await?;
        entries.retain(|_, entry| !entry.is_expired());

        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, CacheEntry>> {
        let err = match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded cache file: {} entries", entries.len());
                return Ok(entries);
            }
            Err(e) => e,
        };

        // Only parse failures are treated as corruption
        if !matches!(err, Error::Json(_)) {
            return Err(err);
        }

        tracing::warn!(
            "Cache file appears corrupted: {}. Attempting recovery from backup.",
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No cache backup found. Starting with empty cache.");
            return Ok(HashMap::new());
        }

        match Self::load(&backup_path).await {
            Ok(entries) => {
                tracing::info!("Recovered cache from backup: {} entries", entries.len());
                if let Err(e) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore cache file from backup: {}", e);
                }
                Ok(entries)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Cache backup also corrupted: {}. Starting with empty cache.",
                    backup_err
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, CacheEntry>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::cache(format!("Failed to read cache file {}: {}", path.display(), e))
        })?;

        let file: CacheFileFormat = serde_json::from_str(&content)?;

        if file.version != CACHE_FILE_VERSION {
            tracing::warn!(
                "Cache file version mismatch: expected {}, got {}. Attempting to load anyway.",
                CACHE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    /// Write the current entries to disk atomically
    async fn persist(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let file = CacheFileFormat {
            version: CACHE_FILE_VERSION.to_string(),
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::cache(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            out.flush().await.map_err(|e| {
                Error::cache(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create cache backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::cache(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Cache written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<RawRecord>> {
        let guard = self.entries.read().await;
        Ok(guard
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: &RawRecord,
        ttl: Duration,
        tags: &[String],
    ) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| !entry.is_expired());
        guard.insert(key.to_string(), CacheEntry::new(value.clone(), ttl, tags));
        self.persist(&guard).await
    }

    async fn forget(&self, key: &str) -> Result<bool> {
        let mut guard = self.entries.write().await;
        if guard.remove(key).is_none() {
            return Ok(false);
        }
        self.persist(&guard).await?;
        Ok(true)
    }

    async fn flush_tags(&self, tags: &[String]) -> Result<bool> {
        let mut guard = self.entries.write().await;
        guard.retain(|_, entry| !entry.has_any_tag(tags));
        self.persist(&guard).await?;
        Ok(true)
    }

    fn supports_tags(&self) -> bool {
        true
    }
}

/// Factory for the "file" store name; reads `cache.path`
pub struct FileCacheStoreFactory;

#[async_trait]
impl CacheStoreFactory for FileCacheStoreFactory {
    async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| Error::config("File cache store requires a path"))?;
        Ok(Arc::new(FileCacheStore::new(path).await?))
    }
}
