use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Kind of content the metadata provider serves
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Tv,
}

impl ContentKind {
    /// Interprets a `type` query parameter: `movie` is a movie, anything else a series
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("movie") => ContentKind::Movie,
            Some(_) => ContentKind::Tv,
        }
    }

    /// TMDb path segment for this kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Tv => "tv",
        }
    }

    /// Date field the provider filters and sorts releases by
    pub fn release_date_field(&self) -> &'static str {
        match self {
            ContentKind::Movie => "primary_release_date",
            ContentKind::Tv => "first_air_date",
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// UI-ready summary of one movie or series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentCard {
    pub id: u64,
    pub title: String,
    pub overview: String,
    /// Full poster URL, empty when the item has no poster
    pub poster: String,
    /// Four-digit year or `N/A`
    pub year: String,
    pub rating: f64,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

/// One page of content cards; paging fields are the provider's values untouched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPage {
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    pub results: Vec<ContentCard>,
}
