//! Runtime configuration for the Memory Card storefront server.

use once_cell::sync::Lazy;
use std::env;

#[derive(Debug)]
pub struct Settings {
    /// Base URL of the RAWG game-data API.
    pub rawg_base_url: String,
    /// API key for RAWG. Empty means requests will be attempted anyway
    /// (and predictably rejected by the provider).
    pub rawg_api_key: String,
    /// Per-attempt request timeout against RAWG (seconds).
    pub rawg_timeout: u64,
    /// Retry budget for 5xx / timeout responses from RAWG.
    pub rawg_max_retries: u32,
    /// Default cache TTL for catalog lookups (seconds).
    pub cache_default_ttl: u64,
    /// TTL for rarely-changing reference data such as genre and
    /// platform lists (seconds).
    pub cache_reference_ttl: u64,
    /// Access-token lifetime (minutes).
    pub access_token_minutes: i64,
    /// Refresh-token lifetime (days).
    pub refresh_token_days: i64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Settings {
    fn from_env() -> Self {
        Settings {
            rawg_base_url: env::var("RAWG_BASE_URL")
                .unwrap_or_else(|_| "https://api.rawg.io/api".into()),
            rawg_api_key: env::var("RAWG_API_KEY").unwrap_or_default(),
            rawg_timeout: env_parse("RAWG_REQUEST_TIMEOUT", 10),
            rawg_max_retries: env_parse("RAWG_MAX_RETRIES", 3),
            cache_default_ttl: env_parse("CACHE_DEFAULT_TTL", 86_400), // 24 h
            cache_reference_ttl: env_parse("CACHE_REFERENCE_TTL", 604_800), // 7 d
            access_token_minutes: env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 15),
            refresh_token_days: env_parse("REFRESH_TOKEN_EXPIRE_DAYS", 7),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
