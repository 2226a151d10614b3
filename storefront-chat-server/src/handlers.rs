use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_chat_core::session::ConversationLog;

use crate::error::ApiError;
use crate::state::{AppState, EnvCheck};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation: ConversationLog,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: ConversationLog,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub completion_configured: bool,
    pub storage_backend: String,
    pub storage_configured: bool,
    pub storage_status: &'static str,
    pub storage_error: Option<String>,
    pub session_count: Option<usize>,
    pub env_check: EnvCheck,
}

pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Malformed chat request");
        ApiError::bad_request("Message and sessionId are required")
    })?;

    let message = request.message.unwrap_or_default();
    let session_id = request.session_id.unwrap_or_default();
    if message.trim().is_empty() || session_id.trim().is_empty() {
        return Err(ApiError::bad_request("Message and sessionId are required"));
    }

    let reply = state.gateway.handle_message(&session_id, &message).await?;
    Ok(Json(ChatResponse {
        response: reply.response,
        conversation: reply.conversation,
    }))
}

pub async fn get_conversation_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let conversation = state.gateway.conversation(&session_id).await?;
    Ok(Json(ConversationResponse { conversation }))
}

pub async fn delete_conversation_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.gateway.clear(&session_id).await?;
    Ok(Json(json!({ "message": "Conversation cleared successfully" })))
}

/// Reports configuration and probes the session store. Never fails.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = &state.status;

    let (storage_status, storage_error, session_count) = if !status.storage_configured {
        ("not_configured", None, None)
    } else {
        match state.gateway.session_count().await {
            Ok(count) => ("connected", None, Some(count)),
            Err(e) => {
                tracing::warn!(error = %e, "Storage health probe failed");
                ("error", Some(e.to_string()), None)
            }
        }
    };

    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
        completion_configured: status.completion_configured,
        storage_backend: status.storage_backend.clone(),
        storage_configured: status.storage_configured,
        storage_status,
        storage_error,
        session_count,
        env_check: status.env_check.clone(),
    })
}
