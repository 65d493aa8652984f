//! Client for the RAWG game-data API.
//!
//! RAWG enforces a fixed quota (1000 requests/hour), so 429 responses fail
//! immediately with a distinct error that callers must not blindly retry.
//! Transient faults (5xx, per-attempt timeouts) are retried with
//! exponential backoff; other 4xx responses mean the request itself is
//! wrong and are not retried.

pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Settings;
use types::{GameDetail, GameSummary, Genre, Paginated, PlatformEntry};

/// RAWG caps `page_size` at 40 server-side; clamp instead of erroring.
pub const MAX_PAGE_SIZE: u32 = 40;

#[derive(Debug, Error)]
pub enum RawgError {
    /// Provider quota exhausted (1000 req/hour). Not retried internally.
    #[error("RAWG rate limit exceeded (1000 requests/hour); try again later")]
    RateLimited,

    #[error("RAWG API error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("RAWG API timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },

    #[error("could not reach RAWG: {0}")]
    Connect(String),

    #[error("unexpected RAWG payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl actix_web::ResponseError for RawgError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            RawgError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RawgError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            RawgError::TimedOut { .. } | RawgError::Connect(_) => StatusCode::SERVICE_UNAVAILABLE,
            RawgError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

/// Raw HTTP outcome of one attempt, before any retry decision.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection error: {0}")]
    Connect(String),
}

/// Seam between the retry engine and the actual HTTP stack, so tests can
/// script responses without a network.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)])
        -> Result<RawResponse, TransportError>;
}

/// Production transport over `reqwest` with a per-attempt timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        HttpTransport { client }
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;
        Ok(RawResponse { status, body })
    }
}

/// Backoff schedule: 1s, 2s, 4s, ... for attempts 0, 1, 2, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

/// Client for RAWG. Constructed once at startup and injected wherever the
/// catalog is composed; owns no global state.
pub struct RawgClient {
    transport: Arc<dyn CatalogTransport>,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl RawgClient {
    pub fn new(settings: &Settings, transport: Arc<dyn CatalogTransport>) -> Self {
        if settings.rawg_api_key.is_empty() {
            log::warn!("RAWG_API_KEY is not configured; catalog requests will fail");
        }
        RawgClient {
            transport,
            base_url: settings.rawg_base_url.trim_end_matches('/').to_string(),
            api_key: settings.rawg_api_key.clone(),
            max_retries: settings.rawg_max_retries,
        }
    }

    /// One logical request: bounded retry loop over the transport.
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut query: Vec<(String, String)>,
    ) -> Result<T, RawgError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        query.push(("key".into(), self.api_key.clone()));

        let mut attempt: u32 = 0;
        loop {
            match self.transport.get(&url, &query).await {
                Ok(resp) if resp.status == 429 => return Err(RawgError::RateLimited),

                Ok(resp) if (500..600).contains(&resp.status) => {
                    if attempt < self.max_retries {
                        let delay = backoff_delay(attempt);
                        log::warn!(
                            "RAWG returned {}; retry {}/{} in {:?}",
                            resp.status,
                            attempt + 1,
                            self.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(RawgError::Upstream {
                        status: resp.status,
                        body: format!("still failing after {} retries", self.max_retries),
                    });
                }

                // Remaining 4xx: the request itself is wrong, retrying
                // cannot help.
                Ok(resp) if (400..500).contains(&resp.status) => {
                    return Err(RawgError::Upstream {
                        status: resp.status,
                        body: resp.body,
                    });
                }

                Ok(resp) => return Ok(serde_json::from_str(&resp.body)?),

                Err(TransportError::Timeout) => {
                    if attempt < self.max_retries {
                        let delay = backoff_delay(attempt);
                        log::warn!(
                            "RAWG timed out; retry {}/{} in {:?}",
                            attempt + 1,
                            self.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(RawgError::TimedOut {
                        attempts: attempt + 1,
                    });
                }

                Err(TransportError::Connect(msg)) => return Err(RawgError::Connect(msg)),
            }
        }
    }

    /// Full-text game search with optional genre/platform filters
    /// (comma-separated RAWG ids, e.g. `"4,51"`).
    pub async fn search_games(
        &self,
        search: &str,
        page: u32,
        page_size: u32,
        genres: Option<&str>,
        platforms: Option<&str>,
    ) -> Result<Paginated<GameSummary>, RawgError> {
        let mut query = vec![
            ("search".to_string(), search.to_string()),
            ("page".to_string(), page.max(1).to_string()),
            (
                "page_size".to_string(),
                page_size.clamp(1, MAX_PAGE_SIZE).to_string(),
            ),
        ];
        if let Some(g) = genres {
            query.push(("genres".into(), g.to_string()));
        }
        if let Some(p) = platforms {
            query.push(("platforms".into(), p.to_string()));
        }
        self.request("games", query).await
    }

    pub async fn game_details(&self, rawg_id: i64) -> Result<GameDetail, RawgError> {
        self.request(&format!("games/{rawg_id}"), Vec::new()).await
    }

    pub async fn list_genres(&self) -> Result<Paginated<Genre>, RawgError> {
        self.request("genres", Vec::new()).await
    }

    pub async fn list_platforms(&self) -> Result<Paginated<PlatformEntry>, RawgError> {
        self.request("platforms", Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        // Guards against a shift overflow if a caller loops far past the
        // configured retry budget.
        assert_eq!(backoff_delay(40), backoff_delay(16));
    }
}
