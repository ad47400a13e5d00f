//! Schema cache keyed at database level

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use sqlgate_core::CacheEntry;

/// Cache of discovered schema names.
///
/// Keyed by the dialect:host:port:database composite. The schema name is not
/// part of the key, so two schema lookups under the same database share one
/// slot.
pub struct SchemaCache {
    entries: RwLock<HashMap<String, CacheEntry<Vec<String>>>>,
    ttl: Duration,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a cached schema list if present and unexpired.
    ///
    /// An expired entry is treated as absent and evicted lazily.
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => {
                    tracing::debug!(key = %key, "schema cache hit");
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            self.entries.write().remove(key);
        }
        tracing::debug!(key = %key, "schema cache miss");
        None
    }

    /// Store a schema list, empty or not.
    pub fn put(&self, key: &str, schemas: Vec<String>) {
        tracing::debug!(key = %key, schema_count = schemas.len(), "caching schema list");
        self.entries
            .write()
            .insert(key.to_string(), CacheEntry::new(schemas, self.ttl));
    }

    /// Sweep out every expired entry. Idempotent, safe under concurrent reads.
    pub fn clean_expired(&self) {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();
        if removed > 0 {
            tracing::info!(removed = removed, "swept expired schema cache entries");
        }
    }

    /// Number of live entries (expired ones included until swept).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop everything.
    pub fn clear(&self) {
        let count = self.entries.read().len();
        tracing::info!(cache_entries = count, "clearing schema cache");
        self.entries.write().clear();
    }
}
