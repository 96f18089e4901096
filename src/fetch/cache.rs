//! Best-effort read-through cache for upstream responses.
//!
//! Entries move from empty to `Populated(value, expires_at)` on a successful
//! fetch. A read at or past `expires_at` behaves like a miss and drops the
//! stale entry. The cache sits outside the consistency-critical path: two
//! concurrent misses for the same key may both go upstream.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Counters describing cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored (including not yet purged stale ones).
    pub entries: usize,
    /// Configured bound, `0` when unbounded.
    pub max_entries: usize,
    /// Reads served from the cache.
    pub hits: u64,
    /// Reads that found nothing fresh.
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
}

/// Cache interface injected into services.
pub trait ReadCache<K, V>: Send + Sync {
    /// Returns a fresh value for `key`, if any.
    fn get(&self, key: &K) -> Option<V>;
    /// Stores `value` under `key` for `ttl`.
    fn insert(&self, key: K, value: V, ttl: Duration);
    /// Returns `true` if a fresh value is stored under `key`.
    fn contains(&self, key: &K) -> bool;
    /// Number of stored entries.
    fn len(&self) -> usize;
    /// Returns `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Usage counters.
    fn stats(&self) -> CacheStats;
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_used: AtomicU64,
}

/// TTL cache over a [`DashMap`] with least-recently-used eviction.
///
/// With `max_entries > 0`, inserting a new key into a full cache first purges
/// expired entries and then evicts the least recently used one. Racing
/// inserts may briefly overshoot the bound by the number of writers.
/// `max_entries == 0` disables the bound.
#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, CacheEntry<V>>,
    max_entries: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache holding at most `max_entries` keys.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a cache without a size bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn make_room(&self, now: Instant) {
        if self.max_entries == 0 || self.entries.len() < self.max_entries {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
                .map(|entry| entry.key().clone());
            let Some(key) = oldest else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl<K, V> ReadCache<K, V> for TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let (value, stale) = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used.store(self.tick(), Ordering::Relaxed);
                (Some(entry.value.clone()), false)
            }
            Some(_) => (None, true),
            None => (None, false),
        };

        if stale {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                last_used: AtomicU64::new(self.tick()),
            },
        );
    }

    fn contains(&self, key: &K) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > now)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            max_entries: self.max_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
