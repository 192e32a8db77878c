//! Completion gateway
//!
//! Thin interface to the external language-model completion call. One
//! attempt, bounded timeout, no retries; every failure is classified so the
//! orchestrator can route it (fallback reply, and distinct HTTP signals for
//! rate-limit/quota).

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::OpenAiBackend;

/// Gateway failures, classified for routing.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Upstream 429 rate limiting; surfaced to HTTP callers as 429.
    #[error("completion backend rate limited")]
    RateLimited,

    /// Account quota exhausted; surfaced to HTTP callers as 503.
    #[error("completion backend quota exhausted")]
    QuotaExceeded,

    /// Timeout, connection failure, or any other upstream error. Recovered
    /// invisibly via the fallback responder.
    #[error("completion backend failure: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prompt turn sent to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Token usage as reported by the backend, passed through to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// Unified seam to the completion backend. The orchestrator only ever talks
/// to this trait; tests substitute a stub.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Completion, CompletionError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
