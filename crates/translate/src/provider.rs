//! HTTP-backed LLM Provider (L4): a single abstract `call(prompt) -> text`
//! operation with the retry/backoff contract owned by the provider, not its
//! callers (spec.md §4.2).
//!
//! Grounded on `gglib-hf/src/http.rs`'s `ReqwestBackend::fetch_with_retry`
//! for the retry-loop shape; the backoff formula is linear and capped at
//! 15s per spec.md §4.2 rather than the teacher's exponential one.

use std::time::Duration;

use async_trait::async_trait;
use bilingo_core::{LlmError, LlmProviderPort};
use serde::Deserialize;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_STEP_MS: u64 = 1000;
const BACKOFF_CAP_MS: u64 = 15_000;

/// Known response envelope shapes a provider may return (design note,
/// spec.md §9): validated one shape at a time with a fallback text field,
/// rather than probing dictionary keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderResponse {
    OpenAiChat { choices: Vec<OpenAiChoice> },
    Anthropic { content: Vec<AnthropicBlock> },
    Simple { text: String },
    Fallback(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

impl ProviderResponse {
    fn into_text(self) -> Option<String> {
        match self {
            Self::OpenAiChat { choices } => choices.into_iter().next().map(|c| c.message.content),
            Self::Anthropic { content } => content.into_iter().next().map(|b| b.text),
            Self::Simple { text } => Some(text),
            Self::Fallback(value) => value
                .get("response")
                .or_else(|| value.get("output"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Apple-to-apples with the 429-quota distinction in spec.md §4.2: a
/// provider-specific free-tier/hard-quota signal embedded in a 429 body.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorDetail {
    #[serde(default)]
    r#type: String,
    #[serde(default)]
    code: String,
}

fn is_quota_signal(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .is_some_and(|e| e.r#type.to_lowercase().contains("quota") || e.code.to_lowercase().contains("quota"))
}

/// Configuration for [`HttpLlmProvider`], read from `Settings` at
/// composition time (spec.md §6: "LLM provider selection + credentials").
#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

pub struct HttpLlmProvider {
    client: reqwest::Client,
    config: LlmProviderConfig,
}

impl HttpLlmProvider {
    #[must_use]
    pub fn new(config: LlmProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_millis((u64::from(attempt) * BACKOFF_STEP_MS).min(BACKOFF_CAP_MS))
    }

    async fn send_once(&self, prompt: &str) -> Result<reqwest::Response, LlmError> {
        self.client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Transient(format!("timeout: {e}"))
                } else {
                    LlmError::Transient(e.to_string())
                }
            })
    }
}

#[async_trait]
impl LlmProviderPort for HttpLlmProvider {
    async fn call(&self, prompt: &str) -> Result<String, LlmError> {
        let mut last_error = LlmError::Transient("exhausted retries".to_string());

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(Self::backoff_delay(attempt - 1)).await;
            }

            let response = match self.send_once(prompt).await {
                Ok(response) => response,
                Err(e) => {
                    last_error = e;
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                let body = response.text().await.unwrap_or_default();
                if is_quota_signal(&body) {
                    return Err(LlmError::QuotaExceeded);
                }
                last_error = LlmError::RateLimited;
                continue;
            }

            if status.is_server_error() {
                last_error = LlmError::Transient(format!("server error {status}"));
                continue;
            }

            if !status.is_success() {
                return Err(LlmError::Internal(format!("unexpected status {status}")));
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = LlmError::Transient(e.to_string());
                    continue;
                }
            };
            if body.trim().is_empty() {
                last_error = LlmError::Transient("empty body".to_string());
                continue;
            }

            let text = serde_json::from_str::<ProviderResponse>(&body)
                .ok()
                .and_then(ProviderResponse::into_text)
                .unwrap_or_default();

            if text.trim().is_empty() {
                last_error = LlmError::Transient("empty response text".to_string());
                continue;
            }

            return Ok(text);
        }

        warn!(attempts = MAX_ATTEMPTS, "LLM provider call exhausted retry budget");
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear_and_caps_at_15s() {
        assert_eq!(HttpLlmProvider::backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(HttpLlmProvider::backoff_delay(5), Duration::from_millis(5000));
        assert_eq!(HttpLlmProvider::backoff_delay(30), Duration::from_millis(15_000));
    }

    #[test]
    fn detects_quota_signal_in_error_body() {
        assert!(is_quota_signal(r#"{"error":{"type":"insufficient_quota"}}"#));
        assert!(is_quota_signal(r#"{"error":{"code":"QUOTA_EXCEEDED"}}"#));
        assert!(!is_quota_signal(r#"{"error":{"type":"rate_limit"}}"#));
        assert!(!is_quota_signal("not json"));
    }

    #[test]
    fn parses_openai_chat_shape() {
        let body = r#"{"choices":[{"message":{"content":"你好"}}]}"#;
        let parsed: ProviderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text(), Some("你好".to_string()));
    }

    #[test]
    fn parses_anthropic_shape() {
        let body = r#"{"content":[{"text":"你好"}]}"#;
        let parsed: ProviderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text(), Some("你好".to_string()));
    }

    #[test]
    fn parses_simple_text_shape() {
        let body = r#"{"text":"你好"}"#;
        let parsed: ProviderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text(), Some("你好".to_string()));
    }
}
