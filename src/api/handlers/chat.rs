use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{api::AppState, error::AppResult};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: Uuid,
}

/// Replies to a chat message, continuing the given conversation when known
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let (conversation_id, response) = state
        .conversations
        .respond(body.conversation_id, &body.message)
        .await;

    Ok(Json(ChatResponse {
        response,
        conversation_id,
    }))
}
