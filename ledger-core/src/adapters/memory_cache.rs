//! In-process cache backed by a concurrent map
//!
//! Entries are stored under their rendered string key with an expiry instant.
//! Expired entries are evicted on read, and every `SWEEP_EVERY` writes a sweep
//! drops the expired entries nobody reads any more, so the map holds at most
//! the keys written within one TTL plus one sweep interval. `tokio::time::Instant`
//! is used so tests can drive expiry with a paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::domain::result::Result;
use crate::ports::{Cache, CacheEntry, CacheKey};

/// Default lifetime of a cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Writes between two sweeps of expired entries
pub const SWEEP_EVERY: usize = 256;

#[derive(Debug, Clone)]
struct Slot {
    entry: CacheEntry,
    expires_at: Instant,
}

/// Thread-safe key-value cache with a fixed per-key time-to-live
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, Slot>,
    ttl: Duration,
    writes: AtomicUsize,
}

impl InMemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live entry exists under `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(&key.to_string())
            .map(|slot| slot.expires_at > Instant::now())
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let key = key.to_string();
        let now = Instant::now();

        if let Some(slot) = self.entries.get(&key) {
            if slot.expires_at > now {
                return Ok(Some(slot.entry.clone()));
            }
        }

        // Expired: evict unless a concurrent writer refreshed it meanwhile
        self.entries.remove_if(&key, |_, slot| slot.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<()> {
        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }
        self.entries.insert(
            key.to_string(),
            Slot {
                entry,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<()> {
        self.entries.remove(&key.to_string());
        Ok(())
    }
}
