use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

pub mod auth;
pub mod chat;
pub mod content;
pub mod generators;
pub mod library;
pub mod mood;
pub mod titles;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
