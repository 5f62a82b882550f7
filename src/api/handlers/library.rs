//! Per-user preferences, watchlist and ratings. Every route needs a session.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::{AppState, Session},
    error::{AppError, AppResult},
    models::{Preferences, Rating, WatchlistItem},
};

const DEFAULT_CONTENT_TYPE: &str = "movie";
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 10.0;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Accepts a positive id sent either as a JSON number or a numeric string
fn parse_tmdb_id(raw: Option<&Value>) -> AppResult<i64> {
    let id = match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    id.filter(|id| *id > 0)
        .ok_or_else(|| AppError::InvalidInput("tmdb_id is required".to_string()))
}

fn content_type_or_default(content_type: Option<String>) -> String {
    content_type
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

fn validate_rating(rating: Option<f64>) -> AppResult<f64> {
    rating
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .ok_or_else(|| AppError::InvalidInput("Rating must be between 1 and 10".to_string()))
}

// ============================================================================
// Preferences
// ============================================================================

pub async fn get_preferences(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Preferences>> {
    let user = state
        .store
        .find_user_by_id(session.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.preferences.0))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    #[serde(default)]
    pub preferences: Preferences,
}

pub async fn update_preferences(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<UpdatePreferencesRequest>,
) -> AppResult<Json<SuccessResponse>> {
    if !state
        .store
        .update_preferences(session.user_id, &body.preferences)
        .await?
    {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %session.user_id, "Preferences updated");
    Ok(SuccessResponse::ok())
}

// ============================================================================
// Watchlist
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub watchlist: Vec<WatchlistItem>,
}

#[derive(Debug, Deserialize)]
pub struct WatchlistRequest {
    pub tmdb_id: Option<Value>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: String,
}

pub async fn get_watchlist(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<WatchlistResponse>> {
    let watchlist = state.store.list_watchlist(session.user_id).await?;
    Ok(Json(WatchlistResponse { watchlist }))
}

/// Adds a title; adding it again refreshes title, poster and date
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<WatchlistRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let item = WatchlistItem {
        user_id: session.user_id,
        tmdb_id: parse_tmdb_id(body.tmdb_id.as_ref())?,
        content_type: content_type_or_default(body.content_type),
        title: body.title,
        poster_path: body.poster_path,
        added_date: Utc::now(),
    };

    state.store.upsert_watchlist_item(&item).await?;
    tracing::info!(
        user_id = %session.user_id,
        tmdb_id = item.tmdb_id,
        content_type = %item.content_type,
        "Added to watchlist"
    );
    Ok(SuccessResponse::ok())
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<WatchlistRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let tmdb_id = parse_tmdb_id(body.tmdb_id.as_ref())?;
    let content_type = content_type_or_default(body.content_type);

    let removed = state
        .store
        .remove_watchlist_item(session.user_id, tmdb_id, &content_type)
        .await?;
    if !removed {
        return Err(AppError::NotFound("Watchlist item not found".to_string()));
    }

    Ok(SuccessResponse::ok())
}

// ============================================================================
// Ratings
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RatingsQuery {
    pub tmdb_id: Option<String>,
    pub content_type: Option<String>,
}

/// A single title's rating, `rating: null` when the user hasn't rated it
#[derive(Debug, Serialize, PartialEq)]
pub struct TitleRating {
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

impl From<Option<Rating>> for TitleRating {
    fn from(rating: Option<Rating>) -> Self {
        match rating {
            Some(r) => Self {
                rating: Some(r.rating),
                review: Some(r.review),
                created_date: Some(r.created_date),
            },
            None => Self {
                rating: None,
                review: None,
                created_date: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RatingsResponse {
    One(TitleRating),
    All { ratings: Vec<Rating> },
}

/// With `tmdb_id` returns that title's rating, otherwise every rating newest first
pub async fn get_ratings(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<RatingsQuery>,
) -> AppResult<Json<RatingsResponse>> {
    let tmdb_id = params.tmdb_id.filter(|id| !id.trim().is_empty());

    match tmdb_id {
        Some(raw) => {
            let tmdb_id = parse_tmdb_id(Some(&Value::String(raw)))?;
            let content_type = content_type_or_default(params.content_type);
            let rating = state
                .store
                .find_rating(session.user_id, tmdb_id, &content_type)
                .await?;
            Ok(Json(RatingsResponse::One(rating.into())))
        }
        None => {
            let ratings = state.store.list_ratings(session.user_id).await?;
            Ok(Json(RatingsResponse::All { ratings }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub tmdb_id: Option<Value>,
    pub content_type: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub review: String,
}

/// Saves a 1-10 rating; rating the same title again replaces it
pub async fn rate(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RateRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let rating = Rating {
        user_id: session.user_id,
        tmdb_id: parse_tmdb_id(body.tmdb_id.as_ref())?,
        content_type: content_type_or_default(body.content_type),
        rating: validate_rating(body.rating)?,
        review: body.review,
        created_date: Utc::now(),
    };

    state.store.upsert_rating(&rating).await?;
    tracing::info!(
        user_id = %session.user_id,
        tmdb_id = rating.tmdb_id,
        rating = rating.rating,
        "Rating saved"
    );
    Ok(SuccessResponse::ok())
}
