use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    error::AppResult,
    models::{ContentKind, TmdbSearchResponse},
    services::providers::MetadataProvider,
};

/// Which catalogs a title search covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Movies first, then series
    Multi,
    Only(ContentKind),
}

impl SearchScope {
    /// `multi`/`all` (or nothing) search both catalogs, `movie`/`movies`
    /// search movies, anything else searches series.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("multi") | Some("all") => SearchScope::Multi,
            Some("movie") | Some("movies") => SearchScope::Only(ContentKind::Movie),
            Some(_) => SearchScope::Only(ContentKind::Tv),
        }
    }
}

/// Tags an item with its kind; series also get movie-style `title` and
/// `release_date` so clients can render both alike.
fn tag(mut item: Map<String, Value>, kind: ContentKind) -> Map<String, Value> {
    item.insert("type".to_string(), Value::String(kind.to_string()));
    if kind == ContentKind::Tv {
        let name = item.get("name").cloned().unwrap_or_else(|| Value::from(""));
        let aired = item
            .get("first_air_date")
            .cloned()
            .unwrap_or_else(|| Value::from(""));
        item.insert("title".to_string(), name);
        item.insert("release_date".to_string(), aired);
    }
    item
}

pub struct TitleSearcher {
    provider: Arc<dyn MetadataProvider>,
}

impl TitleSearcher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Searches titles by name.
    ///
    /// A blank query yields an empty result list without calling the provider.
    /// In multi scope a failing catalog is skipped; in a single scope the
    /// failure propagates.
    pub async fn search(&self, query: &str, scope: SearchScope) -> AppResult<TmdbSearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(TmdbSearchResponse::default());
        }

        match scope {
            SearchScope::Only(kind) => {
                let mut page = self.provider.search(kind, query).await?;
                page.results = page.results.into_iter().map(|item| tag(item, kind)).collect();
                Ok(page)
            }
            SearchScope::Multi => {
                let (movies, series) = tokio::join!(
                    self.provider.search(ContentKind::Movie, query),
                    self.provider.search(ContentKind::Tv, query)
                );

                let mut results = Vec::new();
                for (kind, outcome) in [(ContentKind::Movie, movies), (ContentKind::Tv, series)] {
                    match outcome {
                        Ok(page) => results.extend(page.results.into_iter().map(|item| tag(item, kind))),
                        Err(e) => tracing::warn!(
                            error = %e,
                            kind = %kind,
                            query = %query,
                            "Skipping failed half of multi search"
                        ),
                    }
                }

                Ok(TmdbSearchResponse {
                    results,
                    ..Default::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::providers::MockMetadataProvider;
    use serde_json::json;

    fn page(items: Value) -> TmdbSearchResponse {
        serde_json::from_value(json!({
            "page": 1,
            "total_pages": 1,
            "total_results": 1,
            "results": items
        }))
        .unwrap()
    }

    fn movie_page() -> TmdbSearchResponse {
        page(json!([{ "id": 603, "title": "The Matrix", "release_date": "1999-03-30" }]))
    }

    fn series_page() -> TmdbSearchResponse {
        page(json!([{ "id": 1399, "name": "Game of Thrones", "first_air_date": "2011-04-17" }]))
    }

    #[test]
    fn test_scope_from_param() {
        assert_eq!(SearchScope::from_param(None), SearchScope::Multi);
        assert_eq!(SearchScope::from_param(Some("all")), SearchScope::Multi);
        assert_eq!(
            SearchScope::from_param(Some("movies")),
            SearchScope::Only(ContentKind::Movie)
        );
        assert_eq!(
            SearchScope::from_param(Some("tv")),
            SearchScope::Only(ContentKind::Tv)
        );
        assert_eq!(
            SearchScope::from_param(Some("series")),
            SearchScope::Only(ContentKind::Tv)
        );
    }

    #[tokio::test]
    async fn test_blank_query_skips_provider() {
        let provider = MockMetadataProvider::new();
        let searcher = TitleSearcher::new(Arc::new(provider));
        let result = searcher.search("   ", SearchScope::Multi).await.unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.page, None);
    }

    #[tokio::test]
    async fn test_multi_concatenates_movies_then_series() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_search()
            .returning(|kind, _| match kind {
                ContentKind::Movie => Ok(movie_page()),
                ContentKind::Tv => Ok(series_page()),
            });

        let searcher = TitleSearcher::new(Arc::new(provider));
        let result = searcher.search("the", SearchScope::Multi).await.unwrap();

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0]["type"], "movie");
        assert_eq!(result.results[0]["title"], "The Matrix");
        assert_eq!(result.results[1]["type"], "tv");
        assert_eq!(result.results[1]["title"], "Game of Thrones");
        assert_eq!(result.results[1]["release_date"], "2011-04-17");
        assert_eq!(result.page, None);
    }

    #[tokio::test]
    async fn test_multi_skips_failed_half() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_search().returning(|kind, _| match kind {
            ContentKind::Movie => Err(AppError::ExternalApi("boom".to_string())),
            ContentKind::Tv => Ok(series_page()),
        });

        let searcher = TitleSearcher::new(Arc::new(provider));
        let result = searcher.search("thrones", SearchScope::Multi).await.unwrap();
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0]["type"], "tv");
    }

    #[tokio::test]
    async fn test_single_scope_keeps_paging_and_propagates_errors() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_search()
            .withf(|kind, query| *kind == ContentKind::Tv && query == "thrones")
            .times(1)
            .returning(|_, _| Ok(series_page()));

        let searcher = TitleSearcher::new(Arc::new(provider));
        let result = searcher
            .search(" thrones ", SearchScope::Only(ContentKind::Tv))
            .await
            .unwrap();
        assert_eq!(result.page, Some(1));
        assert_eq!(result.results[0]["title"], "Game of Thrones");

        let mut failing = MockMetadataProvider::new();
        failing
            .expect_search()
            .returning(|_, _| Err(AppError::ExternalApi("status 500".to_string())));
        let searcher = TitleSearcher::new(Arc::new(failing));
        let err = searcher
            .search("matrix", SearchScope::Only(ContentKind::Movie))
            .await
            .unwrap_err();
        assert!(err.is_upstream_failure());
    }
}
