use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use storefront_chat_agent::ChatError;
use storefront_chat_core::session::StoreError;
use storefront_chat_providers::ProviderError;

/// JSON error body `{error, message}` with an HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request", message)
    }

    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let api_error = match err {
            ChatError::InvalidRequest(message) => Self::bad_request(message),
            ChatError::BackendUnavailable(StoreError::NotConfigured(message)) => {
                Self::internal("Storage not configured", message)
            }
            ChatError::BackendUnavailable(e) => Self::internal("Database error", e.to_string()),
            ChatError::CompletionFailure(ProviderError::ConfigError(message)) => {
                Self::internal("Completion provider not configured", message)
            }
            ChatError::CompletionFailure(e) => {
                Self::internal("Completion API error", e.to_string())
            }
        };

        if api_error.status.is_server_error() {
            tracing::error!(error = %api_error.error, message = %api_error.message, "API error");
        } else {
            tracing::warn!(message = %api_error.message, "Rejected request");
        }
        api_error
    }
}
