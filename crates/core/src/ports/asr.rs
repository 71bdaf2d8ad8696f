//! ASR Adapter port (L3). Implemented by the `ingest` crate. The underlying
//! transcription model is out of scope (spec.md §1); this port only
//! describes the adapter contract the orchestrator drives.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Segment;

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Transcribes an audio file at `path` into time-aligned segments. The
/// underlying model is not reentrant-safe; callers must serialize calls
/// through a single-permit semaphore (spec.md §4.1, §5).
#[async_trait]
pub trait AsrPort: Send + Sync {
    async fn transcribe(&self, path: &str) -> Result<Vec<Segment>, AsrError>;
}
