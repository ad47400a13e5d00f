//! Time-bounded cache entry

use std::time::{Duration, Instant};

/// A cached value with creation and expiry times.
///
/// A read after expiry must be treated as absent; stores evict expired
/// entries lazily on read or during a sweep.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create an entry that expires `ttl` from now.
    pub fn new(value: T, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self {
            value,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Whether the entry has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Age of the entry.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
