//! LLM Provider port (L4). A single abstract operation; retry/backoff is the
//! provider's responsibility (spec.md §4.2), not the caller's.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,

    /// A 429 carrying a free-tier quota signal. Not retried.
    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait LlmProviderPort: Send + Sync {
    /// Calls the model with a fully-shaped prompt and returns its text
    /// response. Implementations retry up to 5 attempts with linear backoff
    /// capped at 15s on HTTP 429/5xx/timeout/empty-body (spec.md §4.2).
    async fn call(&self, prompt: &str) -> Result<String, LlmError>;
}
