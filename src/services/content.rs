//! Mood/genre aware content discovery.
//!
//! Category selection is a pure function of the mood/genre keys and content
//! kind ([`build_discover_query`]); the provider call and card shaping happen
//! in [`ContentResolver::resolve`].

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{
        CategoryId, ContentCard, ContentKind, ContentPage, GenreKey, MoodKey, TmdbItem,
        DEFAULT_CATEGORY,
    },
    services::providers::{DiscoverQuery, MetadataProvider},
};

/// Minimum number of votes an item needs to be listed
pub const MIN_VOTE_COUNT: u32 = 100;
pub const SORT_BY: &str = "popularity.desc";
/// Genre sentinel meaning "no genre filter"
pub const ALL_GENRES: &str = "all";
const YEAR_UNKNOWN: &str = "N/A";

/// Latest release date shown for the nostalgic mood
pub fn nostalgia_cutoff() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2000, 12, 31)
}

/// Categories for a mood keyword; unknown moods get the default category
pub fn categories_for_mood(mood: &str) -> Vec<CategoryId> {
    match MoodKey::parse(mood) {
        Some(mood) => mood.categories().to_vec(),
        None => vec![DEFAULT_CATEGORY],
    }
}

/// Category for a genre keyword; unknown genres get the default category
pub fn category_for_genre(genre: &str) -> CategoryId {
    GenreKey::parse(genre)
        .map(|genre| genre.category())
        .unwrap_or(DEFAULT_CATEGORY)
}

/// What the caller asked for
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub mood: Option<String>,
    pub genre: Option<String>,
    pub kind: ContentKind,
    pub page: u32,
}

/// Maps a request onto provider filters.
///
/// A mood wins over a genre; a genre of `all` (or none at all) leaves the
/// listing unfiltered. Blank strings count as absent.
pub fn build_discover_query(request: &ContentRequest) -> DiscoverQuery {
    let mood = request.mood.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let genre = request.genre.as_deref().map(str::trim).filter(|g| !g.is_empty());

    let mut categories = None;
    let mut released_on_or_before = None;

    if let Some(mood) = mood {
        categories = Some(categories_for_mood(mood));
        if MoodKey::parse(mood) == Some(MoodKey::Nostalgic) {
            released_on_or_before = nostalgia_cutoff();
        }
    } else if let Some(genre) = genre.filter(|g| !g.eq_ignore_ascii_case(ALL_GENRES)) {
        categories = Some(vec![category_for_genre(genre)]);
    }

    DiscoverQuery {
        kind: request.kind,
        categories,
        released_on_or_before,
        include_adult: false,
        min_vote_count: MIN_VOTE_COUNT,
        sort_by: SORT_BY,
        page: request.page,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Shapes a raw provider item into a card
pub fn to_card(item: TmdbItem, kind: ContentKind, image_base_url: &str) -> ContentCard {
    let poster = match non_empty(item.poster_path) {
        Some(path) => format!("{}{}", image_base_url, path),
        None => String::new(),
    };

    let year = non_empty(item.release_date)
        .or_else(|| non_empty(item.first_air_date))
        .map(|date| date.chars().take(4).collect())
        .unwrap_or_else(|| YEAR_UNKNOWN.to_string());

    ContentCard {
        id: item.id,
        title: non_empty(item.title).or(item.name).unwrap_or_default(),
        overview: item.overview.unwrap_or_default(),
        poster,
        year,
        rating: item.vote_average.unwrap_or(0.0),
        kind,
    }
}

/// Resolves mood/genre requests into pages of content cards
pub struct ContentResolver {
    provider: Arc<dyn MetadataProvider>,
    image_base_url: String,
}

impl ContentResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>, image_base_url: String) -> Self {
        Self {
            provider,
            image_base_url,
        }
    }

    /// Fetches one page. Provider failures propagate; an empty page is a success.
    pub async fn resolve(&self, request: &ContentRequest) -> AppResult<ContentPage> {
        let query = build_discover_query(request);

        tracing::debug!(
            mood = ?request.mood,
            genre = ?request.genre,
            kind = %request.kind,
            page = request.page,
            with_genres = ?query.param("with_genres"),
            provider = self.provider.name(),
            "Resolving content"
        );

        let response = self.provider.discover(&query).await?;

        Ok(ContentPage {
            page: response.page,
            total_pages: response.total_pages,
            results: response
                .results
                .into_iter()
                .map(|item| to_card(item, request.kind, &self.image_base_url))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::TmdbDiscoverResponse;
    use crate::services::providers::MockMetadataProvider;

    const PREFIX: &str = "https://image.tmdb.org/t/p/w500";

    fn request(mood: Option<&str>, genre: Option<&str>, kind: ContentKind) -> ContentRequest {
        ContentRequest {
            mood: mood.map(String::from),
            genre: genre.map(String::from),
            kind,
            page: 1,
        }
    }

    fn ids(query: &DiscoverQuery) -> Option<Vec<u32>> {
        query
            .categories
            .as_ref()
            .map(|c| c.iter().map(|id| id.0).collect())
    }

    #[test]
    fn test_every_mood_selects_its_table_entry() {
        for mood in MoodKey::ALL {
            let query = build_discover_query(&request(Some(mood.as_str()), None, ContentKind::Movie));
            assert_eq!(query.categories.as_deref(), Some(mood.categories()));
        }
    }

    #[test]
    fn test_unknown_mood_falls_back_to_default() {
        let query = build_discover_query(&request(Some("euphoric"), None, ContentKind::Movie));
        assert_eq!(ids(&query), Some(vec![35]));
        assert_eq!(query.released_on_or_before, None);
    }

    #[test]
    fn test_mood_is_case_insensitive() {
        let query = build_discover_query(&request(Some("ScArEd"), None, ContentKind::Tv));
        assert_eq!(ids(&query), Some(vec![27, 53]));
        assert_eq!(query.param("with_genres").as_deref(), Some("27,53"));
    }

    #[test]
    fn test_mood_wins_over_genre() {
        let query = build_discover_query(&request(Some("romantic"), Some("horror"), ContentKind::Movie));
        assert_eq!(ids(&query), Some(vec![10749]));
    }

    #[test]
    fn test_genre_lookup_and_fallback() {
        let query = build_discover_query(&request(None, Some("Sci-Fi"), ContentKind::Movie));
        assert_eq!(ids(&query), Some(vec![878]));

        let query = build_discover_query(&request(None, Some("western"), ContentKind::Movie));
        assert_eq!(ids(&query), Some(vec![35]));
    }

    #[test]
    fn test_no_filter_for_all_or_missing_genre() {
        for genre in [None, Some("all"), Some("ALL"), Some("")] {
            let query = build_discover_query(&request(None, genre, ContentKind::Movie));
            assert_eq!(query.categories, None, "genre {:?}", genre);
        }
    }

    #[test]
    fn test_always_applied_filters() {
        let query = build_discover_query(&request(Some("happy"), None, ContentKind::Tv));
        assert!(!query.include_adult);
        assert_eq!(query.min_vote_count, 100);
        assert_eq!(query.sort_by, "popularity.desc");
    }

    #[test]
    fn test_nostalgic_cutoff_per_kind() {
        let movie = build_discover_query(&request(Some("nostalgic"), None, ContentKind::Movie));
        assert_eq!(movie.param("primary_release_date.lte").as_deref(), Some("2000-12-31"));
        assert_eq!(movie.param("first_air_date.lte"), None);

        let tv = build_discover_query(&request(Some("Nostalgic"), None, ContentKind::Tv));
        assert_eq!(tv.param("first_air_date.lte").as_deref(), Some("2000-12-31"));
        assert_eq!(tv.param("primary_release_date.lte"), None);
    }

    #[test]
    fn test_other_moods_have_no_cutoff() {
        let query = build_discover_query(&request(Some("happy"), None, ContentKind::Movie));
        assert_eq!(query.released_on_or_before, None);
    }

    #[test]
    fn test_card_year_and_poster() {
        let movie = TmdbItem {
            id: 603,
            title: Some("The Matrix".to_string()),
            poster_path: Some("/matrix.jpg".to_string()),
            release_date: Some("1999-03-30".to_string()),
            vote_average: Some(8.2),
            ..Default::default()
        };
        let card = to_card(movie, ContentKind::Movie, PREFIX);
        assert_eq!(card.year, "1999");
        assert_eq!(card.poster, "https://image.tmdb.org/t/p/w500/matrix.jpg");
        assert_eq!(card.rating, 8.2);

        let series = TmdbItem {
            id: 1399,
            name: Some("Game of Thrones".to_string()),
            first_air_date: Some("2011-04-17".to_string()),
            ..Default::default()
        };
        let card = to_card(series, ContentKind::Tv, PREFIX);
        assert_eq!(card.title, "Game of Thrones");
        assert_eq!(card.year, "2011");
        assert_eq!(card.poster, "");
        assert_eq!(card.overview, "");
        assert_eq!(card.rating, 0.0);
        assert_eq!(card.kind, ContentKind::Tv);
    }

    #[test]
    fn test_card_year_unknown_when_dates_missing_or_empty() {
        let item = TmdbItem {
            id: 1,
            title: Some("Untitled".to_string()),
            release_date: Some(String::new()),
            poster_path: Some(String::new()),
            ..Default::default()
        };
        let card = to_card(item, ContentKind::Movie, PREFIX);
        assert_eq!(card.year, "N/A");
        assert_eq!(card.poster, "");
    }

    #[tokio::test]
    async fn test_resolve_passes_page_through() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_discover()
            .withf(|query| query.page == 2 && query.param("page").as_deref() == Some("2"))
            .times(1)
            .returning(|_| {
                Ok(TmdbDiscoverResponse {
                    page: Some(2),
                    total_pages: Some(17),
                    results: vec![TmdbItem {
                        id: 10,
                        title: Some("Airplane!".to_string()),
                        release_date: Some("1980-07-02".to_string()),
                        ..Default::default()
                    }],
                })
            });
        provider.expect_name().return_const("mock");

        let resolver = ContentResolver::new(Arc::new(provider), PREFIX.to_string());
        let page = resolver
            .resolve(&ContentRequest {
                page: 2,
                ..request(Some("happy"), None, ContentKind::Movie)
            })
            .await
            .unwrap();

        assert_eq!(page.page, Some(2));
        assert_eq!(page.total_pages, Some(17));
        assert_eq!(page.results[0].year, "1980");
    }

    #[tokio::test]
    async fn test_resolve_empty_page_is_success() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_discover().returning(|_| {
            Ok(TmdbDiscoverResponse {
                page: Some(1),
                total_pages: Some(0),
                results: vec![],
            })
        });
        provider.expect_name().return_const("mock");

        let resolver = ContentResolver::new(Arc::new(provider), PREFIX.to_string());
        let page = resolver
            .resolve(&request(None, Some("drama"), ContentKind::Tv))
            .await
            .unwrap();
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_propagates_upstream_failure() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_discover()
            .returning(|_| Err(AppError::ExternalApi("TMDb API returned status 503".into())));
        provider.expect_name().return_const("mock");

        let resolver = ContentResolver::new(Arc::new(provider), PREFIX.to_string());
        let err = resolver
            .resolve(&request(Some("sad"), None, ContentKind::Movie))
            .await
            .unwrap_err();
        assert!(err.is_upstream_failure());
    }
}
