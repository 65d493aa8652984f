//! Wire types for the RAWG game-data API.
//!
//! Deliberately lenient: RAWG omits fields freely, so everything that is
//! not an identifier defaults instead of failing the whole payload.

use serde::{Deserialize, Serialize};

/// Standard RAWG pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// RAWG nests platforms one level deeper than genres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub platform: PlatformRef,
}

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default = "Vec::new")]
    pub genres: Vec<Genre>,
}

/// Full record for a single game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDetail {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description_raw: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default = "Vec::new")]
    pub platforms: Vec<PlatformEntry>,
    #[serde(default = "Vec::new")]
    pub genres: Vec<Genre>,
}
