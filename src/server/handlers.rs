//! HTTP handlers.
//!
//! Status mapping (the mobile client's contract): 200 success or invisible
//! fallback, 400 validation, 429 upstream rate limit, 503 upstream quota
//! exhausted, 500 anything else. Rate-limit and quota responses still carry
//! a canned reply in the body; only the status code differs, so the mobile
//! client can drive its own retry/backoff UI.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use super::types::{
    ChatRequest, ChatResponse, EndSessionRequest, ErrorResponse, StatusResponse,
};
use super::AppState;
use crate::classifier::RULESET_VERSION;
use crate::error::CoachError;
use crate::llm::CompletionError;

pub async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ruleset: RULESET_VERSION,
    })
}

pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if let Err(reason) = validate(&request) {
        return bad_request(reason);
    }

    let outcome = state
        .coach
        .handle_chat(
            &request.user_id,
            &request.session_id,
            &request.message,
            &request.conversation_history,
        )
        .await;

    match outcome.degraded {
        Some(CompletionError::RateLimited) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "completion backend rate limited".to_string(),
                response: Some(outcome.reply),
            }),
        )
            .into_response(),
        Some(CompletionError::QuotaExceeded) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "completion backend quota exhausted".to_string(),
                response: Some(outcome.reply),
            }),
        )
            .into_response(),
        // Transient failures were recovered invisibly; the caller sees an
        // ordinary reply.
        _ => Json(ChatResponse {
            response: outcome.reply,
            sentiment: outcome.classification.sentiment,
            topics: outcome.classification.topics,
            risk_level: outcome.classification.risk,
            usage: outcome.usage,
        })
        .into_response(),
    }
}

pub async fn end_session_handler(
    State(state): State<AppState>,
    Json(request): Json<EndSessionRequest>,
) -> Response {
    if request.session_id.trim().is_empty() {
        return bad_request("sessionId is required".to_string());
    }
    if let Some(rating) = request.rating {
        if !(1..=5).contains(&rating) {
            return bad_request("rating must be between 1 and 5".to_string());
        }
    }

    match state.coach.end(&request.session_id, request.rating).await {
        Ok(()) => {
            info!(session_id = %request.session_id, "session closed via API");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => coach_error_response(e),
    }
}

/// Synchronous validation; nothing reaches storage or the completion backend
/// until this passes.
fn validate(request: &ChatRequest) -> Result<(), String> {
    if request.message.trim().is_empty() {
        return Err("message is required".to_string());
    }
    if request.session_id.trim().is_empty() {
        return Err("sessionId is required".to_string());
    }
    match Uuid::parse_str(&request.user_id) {
        Ok(id) if id.get_version_num() == 4 => Ok(()),
        _ => Err("userId must be a valid UUID v4".to_string()),
    }
}

fn bad_request(reason: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: reason, response: None }),
    )
        .into_response()
}

fn coach_error_response(error: CoachError) -> Response {
    let status = match &error {
        CoachError::Validation(_) => StatusCode::BAD_REQUEST,
        CoachError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        CoachError::SessionAlreadyEnded(_) => StatusCode::CONFLICT,
        CoachError::Completion(CompletionError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        CoachError::Completion(CompletionError::QuotaExceeded) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse { error: error.to_string(), response: None }),
    )
        .into_response()
}
