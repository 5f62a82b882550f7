use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::{ContentKind, ContentPage},
    services::content::ContentRequest,
};

#[derive(Debug, Deserialize)]
pub struct ContentParams {
    pub mood: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<String>,
}

/// Pages start at 1; a missing page means the first one
fn parse_page(raw: Option<&str>) -> AppResult<u32> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(1),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| AppError::InvalidInput("page must be a positive integer".to_string())),
    }
}

/// Mood or genre driven listing, also served as `/api/movies`
pub async fn content(
    State(state): State<AppState>,
    Query(params): Query<ContentParams>,
) -> AppResult<Json<ContentPage>> {
    let request = ContentRequest {
        page: parse_page(params.page.as_deref())?,
        kind: ContentKind::from_param(params.kind.as_deref()),
        mood: params.mood,
        genre: params.genre,
    };

    let page = state.resolver.resolve(&request).await?;
    Ok(Json(page))
}
