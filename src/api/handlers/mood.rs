use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::MoodKey,
    services::emotion::{decode_frame, EmotionReading},
};

#[derive(Debug, Deserialize)]
pub struct DetectMoodRequest {
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DetectMoodResponse {
    pub mood: MoodKey,
    pub confidence: f64,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn detected_message(mood: MoodKey, confidence: f64) -> String {
    format!(
        "Detected {} emotion with {}% confidence",
        mood.as_str(),
        (confidence * 100.0).round() as u32
    )
}

impl DetectMoodResponse {
    fn from_reading(reading: EmotionReading) -> AppResult<Self> {
        match reading {
            EmotionReading::Detected { mood, confidence } => Ok(Self {
                mood,
                confidence,
                message: detected_message(mood, confidence),
                degraded: false,
                reason: None,
            }),
            EmotionReading::NoFace => Err(AppError::InvalidInput(
                "No face detected in image".to_string(),
            )),
            EmotionReading::Degraded {
                mood,
                confidence,
                reason,
            } => Ok(Self {
                mood,
                confidence,
                message: detected_message(mood, confidence),
                degraded: true,
                reason: Some(reason),
            }),
        }
    }
}

/// Classifies the mood of the face in a webcam frame
pub async fn detect_mood(
    State(state): State<AppState>,
    Json(body): Json<DetectMoodRequest>,
) -> AppResult<Json<DetectMoodResponse>> {
    if body.image.trim().is_empty() {
        return Err(AppError::InvalidInput("No image data provided".to_string()));
    }

    let classifier = state.classifier.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        decode_frame(&body.image).map(|frame| classifier.classify(&frame, &mut rand::rng()))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Mood detection task failed: {}", e)))?;

    let reading = outcome.map_err(|e| {
        tracing::info!(error = %e, "Rejected undecodable frame");
        AppError::InvalidInput("Failed to decode image".to_string())
    })?;

    Ok(Json(DetectMoodResponse::from_reading(reading)?))
}
