//! Cache-aside behavior of the catalog cache service over the in-memory
//! store: compute runs exactly once per fresh key, errors are never
//! cached, TTLs expire, and prefix invalidation is surgical.

use memorycard_server::cache::{CacheStore, MemoryCacheStore};
use memorycard_server::catalog::{build_key, CacheService};
use memorycard_server::rawg::RawgError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::time::Duration;

fn service(default_ttl: u64) -> (CacheService, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    (CacheService::new(store.clone(), default_ttl), store)
}

#[tokio::test]
async fn compute_runs_exactly_once_for_a_warm_key() {
    let (cache, _) = service(3600);
    let calls = AtomicU32::new(0);

    for _ in 0..2 {
        let value: u32 = cache
            .get_or_compute("counter", None, || async {
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn compute_errors_are_not_cached() {
    let (cache, _) = service(3600);
    let calls = AtomicU32::new(0);

    let first: Result<u32, _> = cache
        .get_or_compute("flaky", None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RawgError::RateLimited)
        })
        .await;
    assert!(first.is_err());

    // The failure must not have produced a negative cache entry.
    let second: u32 = cache
        .get_or_compute("flaky", None, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await
        .unwrap();
    assert_eq!(second, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn default_ttl_applies_when_unspecified() {
    let (cache, _) = service(100);
    let calls = AtomicU32::new(0);

    let compute = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, RawgError>("fresh".to_string())
    };

    let _: String = cache.get_or_compute("k", None, compute).await.unwrap();
    tokio::time::advance(Duration::from_secs(101)).await;
    let _: String = cache.get_or_compute("k", None, compute).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn explicit_ttl_overrides_the_default() {
    let (cache, _) = service(100);
    let calls = AtomicU32::new(0);

    let compute = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, RawgError>(1u8)
    };

    // Reference-data style: much longer than the default.
    let _ = cache
        .get_or_compute("genres", Some(604_800), compute)
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(7_200)).await;
    let _ = cache
        .get_or_compute("genres", Some(604_800), compute)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn prefix_invalidation_removes_exactly_the_matching_keys() {
    let (cache, store) = service(3600);

    store.set("catalog:product:1", "a", None).await.unwrap();
    store.set("catalog:product:2", "b", None).await.unwrap();
    store.set("catalog:search:x", "c", None).await.unwrap();

    let removed = cache.invalidate_by_prefix("catalog:product:").await;
    assert_eq!(removed, 2);
    assert!(!store.exists("catalog:product:1").await.unwrap());
    assert!(!store.exists("catalog:product:2").await.unwrap());
    assert!(store.exists("catalog:search:x").await.unwrap());
}

#[tokio::test]
async fn single_key_invalidation_forces_a_recompute() {
    let (cache, _) = service(3600);
    let calls = AtomicU32::new(0);

    let compute = || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, RawgError>(7u8)
    };

    let key = build_key("catalog", &["game", "7"]);
    let _ = cache.get_or_compute(&key, None, compute).await.unwrap();
    cache.invalidate(&key).await;
    let _ = cache.get_or_compute(&key, None, compute).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
