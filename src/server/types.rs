//! Request/response types for the HTTP API.
//!
//! Field names are camelCase on the wire; malformed or missing fields are
//! rejected by `handlers::validate` before anything touches storage or the
//! completion backend.

use serde::{Deserialize, Serialize};

use crate::classifier::{RiskLevel, Sentiment};
use crate::coach::HistoryTurn;
use crate::llm::Usage;

/// Chat request from the mobile client. All fields default so that a missing
/// field surfaces as a validation error with a reason, not a decode failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Error body. `response` still carries a canned reply on 429/503 so no
/// client is ever left without something to show.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ruleset: &'static str,
}
