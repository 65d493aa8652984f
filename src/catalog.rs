//! Cache-aside orchestration for the proxied game catalog.
//!
//! `CacheService` implements the generic get-or-compute-and-store pattern;
//! `CatalogService` binds it to the RAWG client with the TTL policy:
//! volatile query results keep the process default (24 h), slow-moving
//! reference data (genres, platforms) keeps a much longer TTL (7 d).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::rawg::types::{GameDetail, GameSummary, Genre, Paginated, PlatformEntry};
use crate::rawg::{RawgClient, RawgError};

/// Builds a deterministic colon-joined cache key:
/// `build_key("catalog", &["game", "123"])` → `catalog:game:123`.
pub fn build_key(namespace: &str, parts: &[&str]) -> String {
    let mut key = String::from(namespace);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

pub struct CacheService {
    store: Arc<dyn CacheStore>,
    default_ttl: u64,
}

impl CacheService {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: u64) -> Self {
        CacheService { store, default_ttl }
    }

    /// Cache-aside: return the cached value for `key`, or run `compute`,
    /// store its result under `ttl` (process default when `None`) and
    /// return it. Errors from `compute` propagate uncached — no negative
    /// caching. Store failures degrade to an extra upstream call.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<u64>,
        compute: F,
    ) -> Result<T, RawgError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RawgError>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    log::debug!("cache hit: {key}");
                    return Ok(value);
                }
                // A stale schema in the cache is a miss, not an error.
                Err(e) => log::warn!("cache entry for {key} undecodable, recomputing: {e}"),
            },
            Ok(None) => log::debug!("cache miss: {key}"),
            Err(e) => log::warn!("cache read for {key} failed, recomputing: {e}"),
        }

        let fresh = compute().await?;

        let ttl = ttl.or(Some(self.default_ttl));
        match serde_json::to_string(&fresh) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, &raw, ttl).await {
                    log::warn!("cache write for {key} failed: {e}");
                }
            }
            Err(e) => log::warn!("cache serialize for {key} failed: {e}"),
        }

        Ok(fresh)
    }

    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            log::warn!("cache invalidate for {key} failed: {e}");
        }
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) -> u64 {
        match self.store.delete_by_prefix(prefix).await {
            Ok(n) => {
                log::info!("invalidated {n} cache keys under {prefix}");
                n
            }
            Err(e) => {
                log::warn!("cache prefix invalidate for {prefix} failed: {e}");
                0
            }
        }
    }
}

/// The catalog proxy: every read goes through the cache, shielding the
/// rate-limited provider. Never on the transactional checkout path.
pub struct CatalogService {
    rawg: RawgClient,
    cache: CacheService,
    reference_ttl: u64,
}

impl CatalogService {
    pub fn new(rawg: RawgClient, cache: CacheService, settings: &Settings) -> Self {
        CatalogService {
            rawg,
            cache,
            reference_ttl: settings.cache_reference_ttl,
        }
    }

    pub async fn search_games(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
        genres: Option<&str>,
        platforms: Option<&str>,
    ) -> Result<Paginated<GameSummary>, RawgError> {
        // Every parameter that affects the result is part of the key so
        // distinct queries never collide.
        let key = build_key(
            "catalog",
            &[
                "search",
                query,
                &format!("p{page}"),
                &format!("ps{page_size}"),
                &format!("g{}", genres.unwrap_or("none")),
                &format!("pl{}", platforms.unwrap_or("none")),
            ],
        );
        self.cache
            .get_or_compute(&key, None, || {
                self.rawg
                    .search_games(query, page, page_size, genres, platforms)
            })
            .await
    }

    pub async fn game_details(&self, rawg_id: i64) -> Result<GameDetail, RawgError> {
        let key = build_key("catalog", &["game", &rawg_id.to_string()]);
        self.cache
            .get_or_compute(&key, None, || self.rawg.game_details(rawg_id))
            .await
    }

    pub async fn list_genres(&self) -> Result<Paginated<Genre>, RawgError> {
        let key = build_key("catalog", &["genres"]);
        self.cache
            .get_or_compute(&key, Some(self.reference_ttl), || self.rawg.list_genres())
            .await
    }

    pub async fn list_platforms(&self) -> Result<Paginated<PlatformEntry>, RawgError> {
        let key = build_key("catalog", &["platforms"]);
        self.cache
            .get_or_compute(&key, Some(self.reference_ttl), || {
                self.rawg.list_platforms()
            })
            .await
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) -> u64 {
        self.cache.invalidate_by_prefix(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_colon_joined_and_parameter_complete() {
        assert_eq!(build_key("catalog", &["game", "42"]), "catalog:game:42");
        assert_eq!(
            build_key("catalog", &["search", "zelda", "p2", "ps20", "gnone", "pl4,187"]),
            "catalog:search:zelda:p2:ps20:gnone:pl4,187"
        );
    }
}
