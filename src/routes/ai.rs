//! Copilot chat and health routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::warn;

use crate::config::SERVICE_NAME;
use crate::services::copilot::{self, ChatRequest, ChatResponse, CopilotError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub model: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    code: &'static str,
}

impl IntoResponse for CopilotError {
    fn into_response(self) -> Response {
        let body = ErrorBody { detail: self.to_string(), code: self.error_code() };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// `POST /api/ai/chat`: Answer a chat message with a reply, actions, and suggestions.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, CopilotError> {
    match copilot::handle_chat(&state, request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "copilot: chat failed");
            Err(e)
        }
    }
}

/// `GET /api/ai/health`: Process/config status. Never fails.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        service: SERVICE_NAME,
        model: state.config.model.clone(),
        api_key_configured: state.config.api_key_configured(),
    })
}
