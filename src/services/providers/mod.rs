/// Content metadata provider abstraction
///
/// The resolver, title search and details routes only talk to this trait, so
/// tests can swap TMDb out for a canned provider.
use crate::{
    error::AppResult,
    models::{CategoryId, ContentKind, TmdbDiscoverResponse, TmdbSearchResponse},
};
use chrono::NaiveDate;

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Filters sent to a paginated discovery query
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    pub kind: ContentKind,
    /// Unioned genre filter, `None` for no genre restriction
    pub categories: Option<Vec<CategoryId>>,
    /// Inclusive upper bound on the kind's release date field
    pub released_on_or_before: Option<NaiveDate>,
    pub include_adult: bool,
    pub min_vote_count: u32,
    pub sort_by: &'static str,
    pub page: u32,
}

impl DiscoverQuery {
    /// Flattens the query into provider query-string parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("include_adult".to_string(), self.include_adult.to_string()),
            ("sort_by".to_string(), self.sort_by.to_string()),
            ("language".to_string(), "en-US".to_string()),
            ("vote_count.gte".to_string(), self.min_vote_count.to_string()),
            ("page".to_string(), self.page.to_string()),
        ];

        if let Some(categories) = &self.categories {
            let joined = categories
                .iter()
                .map(CategoryId::to_string)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("with_genres".to_string(), joined));
        }

        if let Some(cutoff) = self.released_on_or_before {
            params.push((
                format!("{}.lte", self.kind.release_date_field()),
                cutoff.format("%Y-%m-%d").to_string(),
            ));
        }

        params
    }

    /// Looks up a single parameter value, mostly useful in tests
    pub fn param(&self, name: &str) -> Option<String> {
        self.to_params()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Trait for content metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// One page of discovery results for the given filters
    ///
    /// Unreachable provider or non-success status is an error; an empty
    /// page is not.
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<TmdbDiscoverResponse>;

    /// Title search within one kind
    async fn search(&self, kind: ContentKind, query: &str) -> AppResult<TmdbSearchResponse>;

    /// Full details for one title, including videos, watch providers and
    /// similar titles
    async fn details(&self, kind: ContentKind, id: u64) -> AppResult<serde_json::Value>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
