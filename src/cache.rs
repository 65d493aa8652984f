//! Key/value cache store with TTL and prefix deletion.
//!
//! Two implementations: Redis for production and a `DashMap`-backed store
//! for tests and Redis-less development. The cache is best-effort (the
//! catalog service treats store failures as misses), so neither
//! implementation offers transactional guarantees.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use tokio::time::{Duration, Instant};

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// `ttl` in seconds; `None` means the key never expires.
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Deletes every key starting with `prefix`, returning how many were
    /// removed. Must not block the whole keyspace while doing so.
    async fn delete_by_prefix(&self, prefix: &str) -> anyhow::Result<u64>;
}

/// Production cache over the shared Redis client.
pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    pub fn new(client: redis::Client) -> Self {
        RedisCacheStore { client }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        match ttl {
            Some(secs) => conn.set_ex::<_, _, ()>(key, value, secs).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.exists(key).await?)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> anyhow::Result<u64> {
        // Incremental SCAN/MATCH cursor walk with batched DELs. KEYS would
        // hold up the whole server on a large keyspace.
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                removed += conn.del::<_, u64>(&keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory cache used by tests and Redis-less development runs.
/// Expiry uses the tokio clock so time-sensitive tests can pause it.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> anyhow::Result<()> {
        let expires_at = ttl.map(|secs| Instant::now() + Duration::from_secs(secs));
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete_by_prefix(&self, prefix: &str) -> anyhow::Result<u64> {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired())
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for key in doomed {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = MemoryCacheStore::new();
        store.set("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.exists("k").await.unwrap());
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = MemoryCacheStore::new();
        store.set("short", "v", Some(60)).await.unwrap();
        store.set("forever", "v", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert!(!store.exists("short").await.unwrap());
        assert_eq!(store.get("forever").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn prefix_delete_spares_other_keys() {
        let store = MemoryCacheStore::new();
        store.set("catalog:product:1", "a", None).await.unwrap();
        store.set("catalog:product:2", "b", None).await.unwrap();
        store.set("catalog:search:x", "c", None).await.unwrap();

        let removed = store.delete_by_prefix("catalog:product:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.get("catalog:product:1").await.unwrap(), None);
        assert_eq!(store.get("catalog:product:2").await.unwrap(), None);
        assert_eq!(
            store.get("catalog:search:x").await.unwrap().as_deref(),
            Some("c")
        );
    }
}
