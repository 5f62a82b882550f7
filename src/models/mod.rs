use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod mood;
pub mod title;
pub mod user;
pub mod user_preferences;

pub use mood::{CategoryId, GenreKey, MoodKey, DEFAULT_CATEGORY};
pub use title::{ContentCard, ContentKind, ContentPage};
pub use user::{NewUser, Rating, SessionRecord, User, UserProfile, WatchlistItem};
pub use user_preferences::Preferences;

// ============================================================================
// TMDb API Types
// ============================================================================

/// One movie or series as returned by `/discover/{movie,tv}`
///
/// Movies carry `title`/`release_date`, series carry `name`/`first_air_date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TmdbItem {
    #[serde(default)]
    pub id: u64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
}

/// A page of discovery results
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TmdbDiscoverResponse {
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub results: Vec<TmdbItem>,
}

/// A page of search results, items kept as raw JSON objects
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TmdbSearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u32>,
    #[serde(default)]
    pub results: Vec<Map<String, Value>>,
}
