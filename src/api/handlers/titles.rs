use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    api::AppState,
    error::AppResult,
    models::{ContentKind, TmdbSearchResponse},
    services::title_search::SearchScope,
};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type", alias = "content-type")]
    pub scope: Option<String>,
}

/// Handler for title search endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<TmdbSearchResponse>> {
    let scope = SearchScope::from_param(params.scope.as_deref());
    let results = state.searcher.search(&params.q, scope).await?;
    Ok(Json(results))
}

pub async fn movie_details(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.provider.details(ContentKind::Movie, id).await?))
}

pub async fn tv_details(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.provider.details(ContentKind::Tv, id).await?))
}
