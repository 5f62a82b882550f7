/// TMDb (The Movie Database) v3 provider
///
/// Endpoints used:
/// 1. Discovery: /discover/{movie,tv} → paginated, filtered listings
/// 2. Search:    /search/{movie,tv}   → title search
/// 3. Details:   /{movie,tv}/{id}     → full record with videos, providers, similar
///
/// Search and details go through the Redis cache; discovery does not, so
/// paging always reflects the live catalog.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{ContentKind, TmdbDiscoverResponse, TmdbSearchResponse},
    services::providers::{DiscoverQuery, MetadataProvider},
};
use reqwest::{Client as HttpClient, Response};
use std::time::Duration;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const DISCOVER_TIMEOUT: Duration = Duration::from_secs(15);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DETAILS_APPENDS: &str = "videos,watch/providers,similar";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// Turns a non-success status into an upstream error carrying the body
    async fn ensure_success(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, provider = "tmdb", "TMDb request failed");
        Err(AppError::ExternalApi(format!(
            "TMDb API returned status {}: {}",
            status, body
        )))
    }

    async fn fetch_search(&self, kind: ContentKind, query: &str) -> AppResult<TmdbSearchResponse> {
        let response = self
            .http_client
            .get(self.url(&format!("search/{}", kind.endpoint())))
            .query(&[("api_key", self.api_key.as_str()), ("query", query)])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let page: TmdbSearchResponse = Self::ensure_success(response).await?.json().await?;

        tracing::info!(
            query = %query,
            kind = %kind,
            results = page.results.len(),
            provider = "tmdb",
            "Title search completed"
        );

        Ok(page)
    }

    async fn fetch_details(&self, kind: ContentKind, id: u64) -> AppResult<serde_json::Value> {
        let response = self
            .http_client
            .get(self.url(&format!("{}/{}", kind.endpoint(), id)))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", "en-US"),
                ("append_to_response", DETAILS_APPENDS),
            ])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{} {}", kind, id)));
        }

        let details = Self::ensure_success(response).await?.json().await?;
        tracing::debug!(kind = %kind, id, provider = "tmdb", "Details fetched");
        Ok(details)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn discover(&self, query: &DiscoverQuery) -> AppResult<TmdbDiscoverResponse> {
        let mut params = query.to_params();
        params.push(("api_key".to_string(), self.api_key.clone()));

        let response = self
            .http_client
            .get(self.url(&format!("discover/{}", query.kind.endpoint())))
            .query(&params)
            .timeout(DISCOVER_TIMEOUT)
            .send()
            .await?;

        let page: TmdbDiscoverResponse = Self::ensure_success(response).await?.json().await?;

        tracing::info!(
            kind = %query.kind,
            page = query.page,
            results = page.results.len(),
            provider = "tmdb",
            "Discovery page fetched"
        );

        Ok(page)
    }

    async fn search(&self, kind: ContentKind, query: &str) -> AppResult<TmdbSearchResponse> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::TitleSearch(kind, query.to_string()),
            SEARCH_CACHE_TTL,
            self.fetch_search(kind, query)
        )
    }

    async fn details(&self, kind: ContentKind, id: u64) -> AppResult<serde_json::Value> {
        cached!(
            self.cache,
            CacheKey::Details(kind, id),
            DETAILS_CACHE_TTL,
            self.fetch_details(kind, id)
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_provider(api_url: &str) -> TmdbProvider {
        provider_with_key(api_url, "test_key")
    }

    fn provider_with_key(api_url: &str, api_key: &str) -> TmdbProvider {
        let client = redis::Client::open("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);
        TmdbProvider::new(cache, api_key.to_string(), api_url.to_string())
    }

    fn first_page_query() -> DiscoverQuery {
        DiscoverQuery {
            kind: ContentKind::Movie,
            categories: None,
            released_on_or_before: None,
            include_adult: false,
            min_vote_count: 100,
            sort_by: "popularity.desc",
            page: 1,
        }
    }

    #[tokio::test]
    async fn test_url_joins_without_double_slash() {
        let provider = create_test_provider("http://test.local/3/");
        assert_eq!(provider.url("/discover/movie"), "http://test.local/3/discover/movie");
        assert_eq!(provider.url("tv/1399"), "http://test.local/3/tv/1399");
    }

    #[tokio::test]
    async fn test_empty_search_rejected_before_network() {
        let provider = create_test_provider("http://test.local/3");
        let result = provider.search(ContentKind::Movie, "   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_upstream_failure() {
        // Nothing listens on port 1; the connection is refused immediately.
        let provider = create_test_provider("http://127.0.0.1:1/3");
        let err = provider.discover(&first_page_query()).await.unwrap_err();
        assert!(err.is_upstream_failure(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_connection_failure_keeps_api_key_private() {
        use axum::response::IntoResponse;

        let provider = provider_with_key("http://127.0.0.1:1/3", "SECRET_TMDB_KEY");
        let err = provider.discover(&first_page_query()).await.unwrap_err();
        assert!(!err.to_string().contains("SECRET_TMDB_KEY"));

        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("SECRET_TMDB_KEY"), "body: {body}");
        assert!(!body.contains("api_key"), "body: {body}");
    }

    #[tokio::test]
    async fn test_name() {
        assert_eq!(create_test_provider("http://test.local").name(), "tmdb");
    }
}
