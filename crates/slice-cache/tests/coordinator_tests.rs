//! End-to-end behaviour of the cache coordinator against a fake grid source.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use sha1::{Digest, Sha1};
use slice_cache::{CacheConfig, CacheCoordinator, FetchError, FetchKey, GridDataSource, Raster};
use test_utils::{fixtures::keys, temp_cache_config, wait_until, FakeGridSource};
use tokio_test::assert_err;

fn reference_key() -> FetchKey {
    FetchKey::new(keys::FIELD, keys::TIMESTEP, keys::QUALITY)
}

/// Fetch closure reading `key` from `source`, the way the loader wires it.
fn fetch_from(
    source: &Arc<FakeGridSource>,
    key: &FetchKey,
) -> impl FnOnce() -> Result<Raster, slice_cache::SourceError> + Send + 'static {
    let source = source.clone();
    let key = key.clone();
    move || source.read(key.field(), key.timestep(), key.quality(), None)
}

// =============================================================================
// Single-flight
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_fetch_once() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(6, 12).with_latency(Duration::from_millis(50)));
    let key = reference_key();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let coordinator = coordinator.clone();
            let fetch = fetch_from(&source, &key);
            let key = key.clone();
            tokio::spawn(async move { coordinator.acquire(key, fetch).await })
        })
        .collect();

    let rasters: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(source.calls(), 1);
    assert_eq!(rasters.len(), 10);
    for raster in &rasters {
        assert_eq!(raster.as_bytes(), rasters[0].as_bytes());
    }
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquires_share_one_error() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(
        FakeGridSource::new(6, 12)
            .with_latency(Duration::from_millis(50))
            .failing_on(keys::TIMESTEP),
    );
    let key = reference_key();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let coordinator = coordinator.clone();
            let fetch = fetch_from(&source, &key);
            let key = key.clone();
            tokio::spawn(async move { coordinator.acquire(key, fetch).await })
        })
        .collect();

    let errors: Vec<FetchError> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| assert_err!(r.unwrap()))
        .collect();

    assert_eq!(source.calls(), 1);
    for err in &errors {
        assert!(matches!(err, FetchError::Source { .. }));
        assert_eq!(err.to_string(), errors[0].to_string());
    }

    // nothing cached on failure
    assert!(!coordinator.is_cached(&key));
    assert!(!coordinator.disk().path_for(&key).unwrap().exists());
    assert_eq!(coordinator.stats().fetch_failures, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_fetch_in_parallel() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(4, 4).with_latency(Duration::from_millis(100)));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let coordinator = coordinator.clone();
            let key = FetchKey::new(keys::FIELD, 20_000 + t, -6);
            let fetch = fetch_from(&source, &key);
            tokio::spawn(async move { coordinator.acquire(key, fetch).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(source.calls(), 4);
    assert!(source.max_concurrent() > 1);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_reference_key_writes_sha1_named_blob() {
    let (dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(6, 12));
    let key = reference_key();

    let first = coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    let digest = hex::encode(Sha1::digest(keys::DISPLAY.as_bytes()));
    let expected = dir.path().join("data_cache").join(format!("{digest}.npy"));
    assert!(expected.is_file());
    assert_eq!(coordinator.disk().path_for(&key), Some(expected));

    coordinator.clear_memory();
    let second = coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert!(second.is_memory_mapped());
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(coordinator.stats().disk_hits, 1);
}

#[tokio::test]
async fn test_new_coordinator_reuses_disk_blobs() {
    let (_dir, config) = temp_cache_config(8);
    let source = Arc::new(FakeGridSource::new(6, 12));
    let key = reference_key();

    let original = {
        let coordinator = CacheCoordinator::new(&config).unwrap();
        coordinator
            .acquire(key.clone(), fetch_from(&source, &key))
            .await
            .unwrap()
    };

    let restarted = CacheCoordinator::new(&config).unwrap();
    let reloaded = restarted
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(original.as_bytes(), reloaded.as_bytes());
    assert_eq!(original.shape(), reloaded.shape());
}

#[tokio::test]
async fn test_disk_hit_is_not_promoted_to_memory() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(2, 2));
    let key = reference_key();

    coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();
    coordinator.clear_memory();
    coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    assert!(!coordinator.memory().contains(&key));
    assert!(coordinator.is_cached(&key));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_disk_hits() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(6, 12));
    let key = reference_key();

    let original = coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();
    coordinator.clear_memory();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let coordinator = coordinator.clone();
            let fetch = fetch_from(&source, &key);
            let key = key.clone();
            tokio::spawn(async move { coordinator.acquire(key, fetch).await })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        let raster = handle.unwrap().unwrap();
        assert!(raster.is_memory_mapped());
        assert_eq!(raster.as_bytes(), original.as_bytes());
    }

    assert_eq!(source.calls(), 1);
    assert_eq!(coordinator.stats().disk_hits, 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_of_corrupt_blob_refetch_once() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(6, 12).with_latency(Duration::from_millis(30)));
    let key = reference_key();

    fs::write(coordinator.disk().path_for(&key).unwrap(), b"\x93NUMPY broken").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            let fetch = fetch_from(&source, &key);
            let key = key.clone();
            tokio::spawn(async move { coordinator.acquire(key, fetch).await })
        })
        .collect();

    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }

    assert_eq!(source.calls(), 1);
    assert_eq!(coordinator.stats().fetches, 1);
}

#[tokio::test]
async fn test_corrupt_blob_is_refetched() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(6, 12));
    let key = reference_key();

    let original = coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();
    let path = coordinator.disk().path_for(&key).unwrap();
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    coordinator.clear_memory();
    let refetched = coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    assert_eq!(source.calls(), 2);
    assert_eq!(original.as_bytes(), refetched.as_bytes());
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[tokio::test]
async fn test_disabled_disk_tier_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig {
        cache_dir: dir.path().join("never-created"),
        memory_capacity: 4,
        disk_enabled: false,
    };
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(2, 2));
    let key = reference_key();

    coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();
    coordinator.clear_memory();
    coordinator
        .acquire(key.clone(), fetch_from(&source, &key))
        .await
        .unwrap();

    assert_eq!(source.calls(), 2);
    assert!(!config.cache_dir.exists());
}

#[tokio::test]
async fn test_abandoned_acquire_still_populates_caches() {
    let (_dir, config) = temp_cache_config(8);
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(2, 2).with_latency(Duration::from_millis(50)));
    let key = reference_key();

    let abandoned = coordinator.acquire(key.clone(), fetch_from(&source, &key));
    let _ = tokio::time::timeout(Duration::from_millis(5), abandoned).await;

    wait_until!(coordinator.in_flight() == 0);
    assert_eq!(source.calls(), 1);
    assert!(coordinator.memory().contains(&key));
    assert!(coordinator.disk().contains(&key));
}

#[tokio::test]
async fn test_memory_capacity_is_respected() {
    let (_dir, mut config) = temp_cache_config(2);
    config.disk_enabled = false;
    let coordinator = CacheCoordinator::new(&config).unwrap();
    let source = Arc::new(FakeGridSource::new(2, 2));

    for t in 0..5 {
        let key = FetchKey::new(keys::FIELD, t, 0);
        coordinator
            .acquire(key.clone(), fetch_from(&source, &key))
            .await
            .unwrap();
    }

    let stats = coordinator.stats();
    assert_eq!(stats.memory.entries, 2);
    assert_eq!(stats.memory.evictions, 3);
    assert_eq!(stats.fetches, 5);
}
