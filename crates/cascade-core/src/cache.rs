//! Resolution cache: compute-once memoization of resolved configurations
//!
//! Keys pair a normalized file path with the resolution fingerprint the
//! result was computed under. A fragment change produces a new fingerprint,
//! so entries computed from old content become unreachable; they are purged
//! on reload or evicted first when the cache is over capacity.

use crate::config::resolved::ResolvedConfiguration;
use crate::fingerprint::Fingerprint;
use crate::result::Result;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default maximum number of cached resolutions
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Cache key: (normalized path, resolution fingerprint)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: String,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(path: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }
}

/// One cache slot; filled exactly once, by whichever caller gets there first
#[derive(Debug, Default)]
struct CacheSlot {
    value: OnceCell<Arc<ResolvedConfiguration>>,
    last_access: AtomicU64,
}

impl CacheSlot {
    fn touch(&self, tick: u64) {
        self.last_access.store(tick, Ordering::Relaxed);
    }

    fn is_filled(&self) -> bool {
        self.value.get().is_some()
    }
}

/// Concurrent resolution cache with a compute-once guarantee per key
#[derive(Debug)]
pub struct ResolutionCache {
    entries: DashMap<CacheKey, Arc<CacheSlot>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache holding at most `capacity` resolutions (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up a filled entry without computing anything
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResolvedConfiguration>> {
        let slot = self.entries.get(key)?;
        let value = slot.value.get().cloned()?;
        slot.touch(self.tick());
        Some(value)
    }

    /// Return the cached resolution for `key`, computing it at most once
    ///
    /// Concurrent callers for the same uncached key block until the first
    /// caller's computation finishes and then share its result. A failed
    /// computation is not cached; the next caller retries.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<ResolvedConfiguration>>
    where
        F: FnOnce() -> Result<ResolvedConfiguration>,
    {
        let slot = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(CacheSlot::default()))
                .value(),
        );
        slot.touch(self.tick());

        if let Some(value) = slot.value.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Resolution cache hit for '{}'", key.path);
            return Ok(Arc::clone(value));
        }

        let mut computed = false;
        let result = slot
            .value
            .get_or_try_init(|| {
                computed = true;
                compute().map(Arc::new)
            })
            .cloned();

        match result {
            Ok(value) => {
                if computed {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    self.evict_if_needed(&key);
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok(value)
            }
            Err(err) => {
                self.entries
                    .remove_if(&key, |_, current| Arc::ptr_eq(current, &slot) && !current.is_filled());
                Err(err)
            }
        }
    }

    /// Evict down to capacity: entries under other fingerprints first, then
    /// the least recently used
    fn evict_if_needed(&self, inserted: &CacheKey) {
        if self.entries.len() <= self.capacity {
            return;
        }

        // Keys are collected before removal; removing while iterating a
        // DashMap shard deadlocks.
        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| entry.key().fingerprint != inserted.fingerprint)
            .map(|entry| entry.key().clone())
            .collect();
        for key in stale {
            if self.entries.len() <= self.capacity {
                return;
            }
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }

        let mut candidates: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .filter(|entry| entry.key() != inserted && entry.value().is_filled())
            .map(|entry| (entry.value().last_access.load(Ordering::Relaxed), entry.key().clone()))
            .collect();
        candidates.sort_by_key(|(last_access, _)| *last_access);

        for (_, key) in candidates.into_iter().take(excess) {
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drop every entry not computed under `live`; returns how many were dropped
    pub fn purge_stale(&self, live: &Fingerprint) -> usize {
        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| &entry.key().fingerprint != live)
            .map(|entry| entry.key().clone())
            .collect();

        let purged = stale
            .iter()
            .filter(|key| self.entries.remove(key).is_some())
            .count();
        if purged > 0 {
            tracing::debug!("Purged {} stale resolution(s)", purged);
        }
        purged
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Share of lookups served from the cache, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Get the cache utilization as a percentage
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.size as f64 / self.capacity as f64) * 100.0
        }
    }
}
