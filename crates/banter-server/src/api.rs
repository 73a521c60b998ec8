//! API handlers for the Banter server.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Request body for session start.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub room_name: String,
    pub participant_name: String,
    pub participant_identity: String,
}

/// Response body for a started session.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub token: String,
    pub livekit_url: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `GET /health`.
///
/// `degraded` means the server is up but cannot mint LiveKit tokens.
pub async fn health_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let livekit = state.room_service.is_enabled();
    Json(serde_json::json!({
        "status": if livekit { "ok" } else { "degraded" },
        "livekit": livekit,
    }))
}

/// Handler for `POST /start`.
///
/// Mints a join token for the participant and makes sure the room's agent
/// pipeline is running. The pipeline itself works in the background; the
/// response only waits for the token.
pub async fn start_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    require_field("room_name", &payload.room_name)?;
    require_field("participant_name", &payload.participant_name)?;
    require_field("participant_identity", &payload.participant_identity)?;

    if !state.room_service.is_enabled() {
        return Err(ApiError::ServiceUnavailable(
            "voice platform is not configured".to_string(),
        ));
    }

    let token = state
        .room_service
        .generate_join_token(
            &payload.room_name,
            &payload.participant_identity,
            &payload.participant_name,
        )
        .map_err(|e| ApiError::InternalServerError(format!("token mint failed: {e}")))?;

    state
        .sessions
        .ensure_started(
            &payload.room_name,
            &state.room_service,
            Arc::clone(&state.generator),
        )
        .await
        .map_err(|e| ApiError::InternalServerError(format!("agent start failed: {e}")))?;

    tracing::info!(
        room = %payload.room_name,
        participant = %payload.participant_identity,
        "session started"
    );

    Ok(Json(StartResponse {
        token,
        livekit_url: state.room_service.public_url().to_string(),
    }))
}

fn require_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{name} must not be empty")));
    }
    Ok(())
}
