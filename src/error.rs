//! Error taxonomy for the coach pipeline.
//!
//! Callers match on these to pick a recovery strategy; internal code keeps
//! using `anyhow::Result` for ad-hoc context chains. The HTTP layer maps
//! variants to status codes in `server::handlers`.

use thiserror::Error;

use crate::llm::CompletionError;

#[derive(Debug, Error)]
pub enum CoachError {
    /// Rejected before any storage or backend access.
    #[error("validation: {0}")]
    Validation(String),

    #[error("completion backend: {0}")]
    Completion(#[from] CompletionError),

    #[error("storage: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A second `end` on the same session; nothing is persisted.
    #[error("session already ended: {0}")]
    SessionAlreadyEnded(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
