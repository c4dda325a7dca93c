//! Bounded in-process LRU of shared rasters.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::Serialize;

use crate::key::FetchKey;
use crate::raster::Raster;

/// Statistics for the memory tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl MemoryCacheStats {
    /// Hit rate in `0.0..=1.0`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache mapping fetch keys to shared, immutable rasters.
///
/// Capacity is an entry count. The lock is only held for the map operation
/// itself; rasters are handed out as `Arc` clones.
pub struct MemoryCache {
    cache: Mutex<LruCache<FetchKey, Arc<Raster>>>,
    capacity: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` rasters (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<FetchKey, Arc<Raster>>> {
        // Map operations cannot leave the LRU half-updated, so a poisoned
        // lock still guards a consistent cache.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&self, key: &FetchKey) -> Option<Arc<Raster>> {
        let found = self.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Look up `key` without touching recency or statistics.
    pub fn peek(&self, key: &FetchKey) -> Option<Arc<Raster>> {
        self.lock().peek(key).cloned()
    }

    /// Insert `raster`, evicting the least recently used entry when full.
    pub fn put(&self, key: FetchKey, raster: Arc<Raster>) {
        let evicted = {
            let mut cache = self.lock();
            match cache.push(key, raster) {
                // push returns the old value when the key was already present
                Some((old_key, _)) => !cache.contains(&old_key),
                None => false,
            }
        };
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn contains(&self, key: &FetchKey) -> bool {
        self.lock().contains(key)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn stats(&self) -> MemoryCacheStats {
        MemoryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(t: i64) -> FetchKey {
        FetchKey::new("tas_day_ACCESS-CM2_historical_r1i1p1f1_gn", t, -2)
    }

    fn raster(v: f32) -> Arc<Raster> {
        Arc::new(Raster::from_f32(1, 2, vec![v, v]).unwrap())
    }

    #[test]
    fn test_get_returns_shared_raster() {
        let cache = MemoryCache::new(4);
        let r = raster(1.0);
        cache.put(key(1), r.clone());

        let hit = cache.get(&key(1)).unwrap();
        assert!(Arc::ptr_eq(&hit, &r));
        assert!(cache.get(&key(2)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        cache.put(key(1), raster(1.0));
        cache.put(key(2), raster(2.0));

        // touch 1 so 2 becomes the eviction candidate
        assert!(cache.get(&key(1)).is_some());
        cache.put(key(3), raster(3.0));

        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_peek_does_not_touch_recency() {
        let cache = MemoryCache::new(2);
        cache.put(key(1), raster(1.0));
        cache.put(key(2), raster(2.0));

        assert!(cache.peek(&key(1)).is_some());
        cache.put(key(3), raster(3.0));

        assert!(!cache.contains(&key(1)));
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_replacing_a_key_is_not_an_eviction() {
        let cache = MemoryCache::new(2);
        cache.put(key(1), raster(1.0));
        cache.put(key(1), raster(1.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = MemoryCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(key(1), raster(1.0));
        cache.put(key(2), raster(2.0));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key(2)));
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new(4);
        cache.put(key(1), raster(1.0));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key(1)).is_none());
    }
}
