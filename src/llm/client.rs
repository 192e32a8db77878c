//! OpenAI-compatible chat-completion client.
//!
//! Sampling parameters are fixed per call rather than user-configurable:
//! bounded token budget, moderate temperature, mild repetition penalties.
//! This keeps the coach's tone consistent and the per-reply cost bounded.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Completion, CompletionBackend, CompletionError, PromptMessage, Usage};
use crate::config::Config;

/// Reply budget in tokens. A coaching reply is a short paragraph; anything
/// longer reads as a lecture.
const MAX_COMPLETION_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.7;
const PRESENCE_PENALTY: f64 = 0.3;
const FREQUENCY_PENALTY: f64 = 0.3;

pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl OpenAiBackend {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.completion_timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            api_key: config.completion_api_key.clone(),
            api_base: config.completion_base_url.trim_end_matches('/').to_string(),
            model: config.completion_model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Completion, CompletionError> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": TEMPERATURE,
            "presence_penalty": PRESENCE_PENALTY,
            "frequency_penalty": FREQUENCY_PENALTY,
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send();

        // The reqwest client carries the same timeout; the explicit bound
        // here also covers connection setup.
        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("completion request failed: {e}");
                return Err(CompletionError::Transient(e.to_string()));
            }
            Err(_) => {
                warn!("completion request timed out after {:?}", self.timeout);
                return Err(CompletionError::Transient("timeout".to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::Transient(format!("invalid response body: {e}")))?;

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CompletionError::Transient("empty completion".to_string()))?
            .to_string();

        let usage: Option<Usage> = serde_json::from_value(body["usage"].clone()).ok();
        debug!(chars = text.len(), "completion received");

        Ok(Completion { text, usage })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Map an upstream HTTP failure onto the gateway taxonomy. OpenAI reports
/// exhausted quota as a 429 with code `insufficient_quota`, so the body has
/// to be consulted before calling a 429 a rate limit.
fn classify_http_failure(status: StatusCode, body: &str) -> CompletionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            if body.contains("insufficient_quota") {
                CompletionError::QuotaExceeded
            } else {
                CompletionError::RateLimited
            }
        }
        StatusCode::PAYMENT_REQUIRED => CompletionError::QuotaExceeded,
        _ => CompletionError::Transient(format!("upstream {status}: {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exhaustion_is_distinguished_from_rate_limiting() {
        let quota = classify_http_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":"insufficient_quota"}}"#,
        );
        assert!(matches!(quota, CompletionError::QuotaExceeded));

        let limited = classify_http_failure(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":"rate_limit_exceeded"}}"#,
        );
        assert!(matches!(limited, CompletionError::RateLimited));
    }

    #[test]
    fn other_upstream_failures_are_transient() {
        let err = classify_http_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, CompletionError::Transient(_)));
    }
}
