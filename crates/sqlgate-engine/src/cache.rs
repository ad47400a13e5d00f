//! Bounded, time-limited query result cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use sqlgate_core::CacheEntry;

use crate::result::ExecutionResult;

struct CacheSlot {
    entry: CacheEntry<ExecutionResult>,
    last_access: Instant,
}

/// Result cache keyed by the original (pre-optimization) SQL text.
///
/// Purely a speed optimization: concurrent misses for the same text may each
/// execute once, and a race on the write slot is last-writer-wins. Staleness
/// is bounded only by the TTL; there is no per-statement invalidation.
pub struct QueryCache {
    slots: RwLock<HashMap<String, CacheSlot>>,
    ttl: Duration,
    capacity: usize,
}

impl QueryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Fetch an unexpired result, refreshing its recency. Expired entries
    /// are evicted lazily here.
    pub fn get(&self, sql: &str) -> Option<ExecutionResult> {
        let mut slots = self.slots.write();
        match slots.get_mut(sql) {
            Some(slot) if !slot.entry.is_expired() => {
                slot.last_access = Instant::now();
                tracing::debug!(age_ms = slot.entry.age().as_millis() as u64, "query cache hit");
                let mut result = slot.entry.value.clone();
                result.from_cache = true;
                Some(result)
            }
            Some(_) => {
                slots.remove(sql);
                None
            }
            None => None,
        }
    }

    /// Store a result. At capacity the least-recently-accessed slot is
    /// evicted to make room.
    pub fn put(&self, sql: &str, result: ExecutionResult) {
        let mut slots = self.slots.write();
        if !slots.contains_key(sql) && slots.len() >= self.capacity {
            let coldest = slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone());
            if let Some(key) = coldest {
                tracing::debug!("query cache full, evicting least recently used entry");
                slots.remove(&key);
            }
        }
        slots.insert(
            sql.to_string(),
            CacheSlot {
                entry: CacheEntry::new(result, self.ttl),
                last_access: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    pub fn clear(&self) {
        let removed = {
            let mut slots = self.slots.write();
            let n = slots.len();
            slots.clear();
            n
        };
        tracing::debug!(removed = removed, "cleared query cache");
    }
}
