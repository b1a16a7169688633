// # Cache Store Implementations
//
// This module provides implementations of the CacheStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileCacheStore, FileCacheStoreFactory};
pub use memory::{MemoryCacheStore, MemoryCacheStoreFactory};

/// Register the built-in stores as "memory" and "file"
pub fn register(registry: &crate::ProviderRegistry) {
    registry.register_cache_store("memory", Box::new(MemoryCacheStoreFactory));
    registry.register_cache_store("file", Box::new(FileCacheStoreFactory));
}
