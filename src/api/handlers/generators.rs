//! Canned "AI" text endpoints. All of them are template lookups.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, services::generators};

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub movies: Vec<String>,
}

pub async fn ai_match(Json(body): Json<MatchRequest>) -> AppResult<Json<MatchResponse>> {
    Ok(Json(MatchResponse {
        movies: generators::ai_match(&body.description),
    }))
}

fn default_style() -> String {
    "creative".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SynopsisRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_style")]
    pub style: String,
}

#[derive(Debug, Serialize)]
pub struct SynopsisResponse {
    pub synopsis: String,
}

pub async fn generate_synopsis(
    Json(body): Json<SynopsisRequest>,
) -> AppResult<Json<SynopsisResponse>> {
    Ok(Json(SynopsisResponse {
        synopsis: generators::synopsis(&body.title, &body.style),
    }))
}

#[derive(Debug, Deserialize)]
pub struct MashupRequest {
    #[serde(default)]
    pub movie1: String,
    #[serde(default)]
    pub movie2: String,
}

#[derive(Debug, Serialize)]
pub struct MashupResponse {
    pub mashup: String,
}

pub async fn movie_mashup(Json(body): Json<MashupRequest>) -> AppResult<Json<MashupResponse>> {
    let mashup = generators::mashup(&body.movie1, &body.movie2, &mut rand::rng());
    Ok(Json(MashupResponse { mashup }))
}

fn default_genre() -> String {
    "action".to_string()
}

fn default_level() -> String {
    "medium".to_string()
}

#[derive(Debug, Deserialize)]
pub struct PredictSuccessRequest {
    #[serde(default = "default_genre")]
    pub genre: String,
    #[serde(default = "default_level")]
    pub budget_range: String,
    #[serde(default = "default_level")]
    pub cast_popularity: String,
}

#[derive(Debug, Serialize)]
pub struct PredictSuccessResponse {
    pub success_probability: i64,
}

pub async fn predict_success(
    Json(body): Json<PredictSuccessRequest>,
) -> AppResult<Json<PredictSuccessResponse>> {
    let success_probability = generators::predict_success(
        &body.genre,
        &body.budget_range,
        &body.cast_popularity,
        &mut rand::rng(),
    );
    Ok(Json(PredictSuccessResponse {
        success_probability,
    }))
}

/// Body shared by the per-title generators
#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub genre: String,
}

#[derive(Debug, Serialize)]
pub struct TriviaResponse {
    pub trivia: String,
}

pub async fn trivia(Json(body): Json<TitleRequest>) -> AppResult<Json<TriviaResponse>> {
    Ok(Json(TriviaResponse {
        trivia: generators::trivia(&body.title, &mut rand::rng()),
    }))
}

#[derive(Debug, Serialize)]
pub struct EndingResponse {
    pub ending: String,
}

pub async fn alternate_ending(Json(body): Json<TitleRequest>) -> AppResult<Json<EndingResponse>> {
    Ok(Json(EndingResponse {
        ending: generators::alternate_ending(&body.title, &body.genre, &mut rand::rng()),
    }))
}

#[derive(Debug, Serialize)]
pub struct SequelResponse {
    pub sequel: String,
}

pub async fn sequel_idea(Json(body): Json<TitleRequest>) -> AppResult<Json<SequelResponse>> {
    Ok(Json(SequelResponse {
        sequel: generators::sequel_idea(&body.title, &body.genre, &mut rand::rng()),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlotMoodRequest {
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Serialize)]
pub struct PlotMoodResponse {
    pub moods: Vec<String>,
}

pub async fn plot_mood(Json(body): Json<PlotMoodRequest>) -> AppResult<Json<PlotMoodResponse>> {
    Ok(Json(PlotMoodResponse {
        moods: generators::plot_moods(&body.keywords),
    }))
}
