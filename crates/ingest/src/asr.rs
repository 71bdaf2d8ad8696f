//! ASR Adapter (L3): hands an audio path off to a remote transcription
//! service and serializes calls through a single-permit semaphore, since
//! the underlying model is not reentrant-safe (spec.md §4.1).
//!
//! The model itself is out of scope (spec.md §1: "the ASR model loader
//! `transcribe(path) -> segments`"); grounded on
//! `original_source/local/whisperx_service.py`'s `WhisperResources`
//! (single `asyncio.Semaphore(1)` guarding `model.transcribe`) and
//! `_process_audio_file`'s segment payload shape.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bilingo_core::{AsrError, AsrPort, Segment};
use serde::Deserialize;
use tokio::sync::Semaphore;

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    text: String,
    start: f64,
    #[serde(default)]
    end: f64,
}

/// Configuration for [`HttpAsrAdapter`] (spec.md §6: "ASR model id").
#[derive(Debug, Clone)]
pub struct AsrConfig {
    pub endpoint: String,
    pub model_id: String,
}

pub struct HttpAsrAdapter {
    client: reqwest::Client,
    config: AsrConfig,
    semaphore: Arc<Semaphore>,
}

impl HttpAsrAdapter {
    #[must_use]
    pub fn new(config: AsrConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config, semaphore: Arc::new(Semaphore::new(1)) }
    }
}

#[async_trait]
impl AsrPort for HttpAsrAdapter {
    async fn transcribe(&self, path: &str) -> Result<Vec<Segment>, AsrError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| AsrError::Internal(e.to_string()))?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&serde_json::json!({ "model": self.config.model_id, "audio_path": path }))
            .send()
            .await
            .map_err(|e| AsrError::Transient(e.to_string()))?;

        if response.status().is_server_error() {
            return Err(AsrError::Transient(format!("server error {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(AsrError::Internal(format!("unexpected status {}", response.status())));
        }

        let body: TranscribeResponse = response
            .json()
            .await
            .map_err(|e| AsrError::Internal(format!("malformed transcription response: {e}")))?;

        Ok(body
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let start = raw.start.max(0.0);
                let end = raw.end.max(start);
                Segment::new(index as u32, start, end, raw.text)
            })
            .collect())
    }
}
