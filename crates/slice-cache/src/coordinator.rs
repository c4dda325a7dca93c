//! Single-flight coordination of the two cache tiers and the remote source.
//!
//! Lookup order for [`CacheCoordinator::acquire`]:
//!
//! 1. disk tier (a hit is returned without being promoted to memory)
//! 2. memory tier
//! 3. an outstanding fetch for the same key, whose result is shared
//! 4. a new fetch, which populates both tiers on success
//!
//! Disk lookups and fetches run on the blocking pool. At most one fetch per
//! key is in flight. The fetch runs inside a spawned task, so a caller that drops its `acquire` future
//! does not cancel it; the result still lands in the caches.
//!
//! Lock order is in-flight table, then memory tier. The fetch task never
//! holds the memory lock while taking the in-flight lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::disk::DiskCache;
use crate::error::{CacheSetupError, FetchError, SourceError};
use crate::key::FetchKey;
use crate::memory::{MemoryCache, MemoryCacheStats};
use crate::raster::Raster;

type FetchResult = Result<Arc<Raster>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Counters for a [`CacheCoordinator`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinatorStats {
    pub disk_hits: u64,
    pub memory_hits: u64,
    /// Fetches that completed successfully.
    pub fetches: u64,
    /// Callers that waited on another caller's fetch.
    pub coalesced: u64,
    pub fetch_failures: u64,
    pub in_flight: usize,
    pub memory: MemoryCacheStats,
}

#[derive(Default)]
struct Counters {
    disk_hits: AtomicU64,
    memory_hits: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    fetch_failures: AtomicU64,
}

struct Inner {
    memory: MemoryCache,
    disk: DiskCache,
    in_flight: Mutex<HashMap<FetchKey, SharedFetch>>,
    counters: Counters,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<FetchKey, SharedFetch>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Two-tier raster cache with at most one in-flight fetch per key.
///
/// Cheap to clone; clones share tiers and in-flight state. Separate
/// coordinators are fully independent, even over the same directory.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

impl CacheCoordinator {
    /// Build both tiers from `config`, creating the blob directory if the
    /// disk tier is enabled.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheSetupError> {
        config.validate().map_err(CacheSetupError::InvalidConfig)?;

        let disk = if config.disk_enabled {
            DiskCache::new(config.data_dir())?
        } else {
            DiskCache::disabled()
        };

        info!(
            memory_capacity = config.memory_capacity,
            disk_dir = ?disk.root(),
            "Slice cache initialized"
        );

        Ok(Self::with_tiers(MemoryCache::new(config.memory_capacity), disk))
    }

    pub fn with_tiers(memory: MemoryCache, disk: DiskCache) -> Self {
        Self {
            inner: Arc::new(Inner {
                memory,
                disk,
                in_flight: Mutex::new(HashMap::new()),
                counters: Counters::default(),
            }),
        }
    }

    /// Return the raster for `key`, calling `fetch` only if neither tier
    /// has it and no other caller is already fetching it.
    ///
    /// `fetch` is a blocking remote read; it runs on the blocking pool.
    /// Callers sharing a fetch all receive its result, including its error.
    /// Failed fetches are not cached.
    pub async fn acquire<F>(&self, key: FetchKey, fetch: F) -> FetchResult
    where
        F: FnOnce() -> Result<Raster, SourceError> + Send + 'static,
    {
        let inner = &self.inner;

        if let Some(raster) = self.read_disk(&key).await {
            inner.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::new(raster));
        }

        if let Some(raster) = inner.memory.get(&key) {
            inner.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Memory cache hit");
            return Ok(raster);
        }

        let pending = {
            let mut in_flight = inner.in_flight();
            if let Some(pending) = in_flight.get(&key) {
                inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Waiting on in-flight fetch");
                pending.clone()
            } else if let Some(raster) = inner.memory.peek(&key) {
                // Landed between the memory lookup and taking the lock.
                inner.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(raster);
            } else {
                let pending = spawn_fetch(self.inner.clone(), key.clone(), fetch);
                in_flight.insert(key, pending.clone());
                pending
            }
        };

        pending.await
    }

    async fn read_disk(&self, key: &FetchKey) -> Option<Raster> {
        if !self.inner.disk.is_enabled() {
            return None;
        }
        let disk = self.inner.disk.clone();
        let lookup = key.clone();
        match tokio::task::spawn_blocking(move || disk.read(&lookup)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %key, error = %e, "Disk lookup aborted");
                None
            }
        }
    }

    pub fn stats(&self) -> CoordinatorStats {
        let counters = &self.inner.counters;
        CoordinatorStats {
            disk_hits: counters.disk_hits.load(Ordering::Relaxed),
            memory_hits: counters.memory_hits.load(Ordering::Relaxed),
            fetches: counters.fetches.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            fetch_failures: counters.fetch_failures.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
            memory: self.inner.memory.stats(),
        }
    }

    /// Drop every memory-tier entry, as a process restart would.
    pub fn clear_memory(&self) {
        self.inner.memory.clear();
    }

    /// Number of fetches currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Whether either tier holds `key`. Does not touch recency.
    ///
    /// Checks for the blob file synchronously; call from blocking code.
    pub fn is_cached(&self, key: &FetchKey) -> bool {
        self.inner.memory.contains(key) || self.inner.disk.contains(key)
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.inner.memory
    }

    pub fn disk(&self) -> &DiskCache {
        &self.inner.disk
    }
}

fn spawn_fetch<F>(inner: Arc<Inner>, key: FetchKey, fetch: F) -> SharedFetch
where
    F: FnOnce() -> Result<Raster, SourceError> + Send + 'static,
{
    let task_key = key.clone();
    let task = tokio::spawn(async move {
        let started = Instant::now();
        let disk = inner.disk.clone();
        let blocking_key = task_key.clone();

        let result = tokio::task::spawn_blocking(move || {
            let raster = fetch().map_err(|e| FetchError::source(blocking_key.clone(), &e))?;
            if let Err(e) = disk.write(&blocking_key, &raster) {
                warn!(key = %blocking_key, error = %e, "Failed to write cache blob");
            }
            Ok(Arc::new(raster))
        })
        .await
        .unwrap_or_else(|e| Err(FetchError::aborted(task_key.clone(), e.to_string())));

        match &result {
            Ok(raster) => {
                inner.memory.put(task_key.clone(), raster.clone());
                inner.counters.fetches.fetch_add(1, Ordering::Relaxed);
                info!(
                    key = %task_key,
                    rows = raster.rows(),
                    cols = raster.cols(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched slice"
                );
            }
            Err(e) => {
                inner.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %task_key, error = %e, "Slice fetch failed");
            }
        }

        // Removed only after the memory insert, so a caller that misses the
        // in-flight entry finds the raster in memory instead.
        inner.in_flight().remove(&task_key);
        result
    });

    async move {
        task.await
            .unwrap_or_else(|e| Err(FetchError::aborted(key, e.to_string())))
    }
    .boxed()
    .shared()
}
