//! Ingestion Orchestrator (H1): the resumable per-item pipeline
//! `download -> transcribe -> translate -> archive -> publish` with
//! bounded concurrency and quota-aware termination (spec.md §4.1).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bilingo_core::{AsrPort, Episode, LlmProviderPort, ObjectStorePort, PodcastRepository, PublishedPodcast, Segment};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};
use translate::{TranslateOptions, TranslatorEngine};

use crate::error::IngestError;
use crate::feed::{can_skip_transcribe, can_skip_translate, FeedClientPort};
use crate::objectstore::{audio_key, segments_key};
use crate::resume::ResumeState;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const DOWNLOAD_MAX_RETRIES: u32 = 3;
const DEFAULT_CONCURRENCY: usize = 3;

/// Outcome of [`IngestionOrchestrator::process_one`].
#[derive(Debug)]
pub enum ItemOutcome {
    Published(String),
    Skipped,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// `processBatch`'s options (spec.md §4.1). `concurrency` defaults to 3
/// per spec.md §5's scheduling model.
#[derive(Debug, Clone)]
pub struct ProcessBatchOptions {
    pub concurrency: usize,
    pub channel_filter: Option<String>,
    pub skip_already_done: bool,
    pub limit: Option<usize>,
}

impl Default for ProcessBatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            channel_filter: None,
            skip_already_done: true,
            limit: None,
        }
    }
}

pub struct IngestionOrchestrator {
    feed: Arc<dyn FeedClientPort>,
    asr: Arc<dyn AsrPort>,
    translator: Arc<TranslatorEngine>,
    object_store: Arc<dyn ObjectStorePort>,
    podcasts: Arc<dyn PodcastRepository>,
    http_client: reqwest::Client,
    download_dir: PathBuf,
    segments_dir: PathBuf,
}

impl IngestionOrchestrator {
    #[must_use]
    pub fn new(
        feed: Arc<dyn FeedClientPort>,
        asr: Arc<dyn AsrPort>,
        llm_provider: Arc<dyn LlmProviderPort>,
        object_store: Arc<dyn ObjectStorePort>,
        podcasts: Arc<dyn PodcastRepository>,
        download_dir: PathBuf,
        segments_dir: PathBuf,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");
        Self {
            feed,
            asr,
            translator: Arc::new(TranslatorEngine::new(llm_provider)),
            object_store,
            podcasts,
            http_client,
            download_dir,
            segments_dir,
        }
    }

    /// `processBatch(items, opts) -> {success, failed, skipped}` (spec.md
    /// §4.1). Aborts cleanly and returns early the moment any item raises
    /// `QuotaExceeded`; every other per-item error is accounted, not fatal.
    pub async fn process_batch(&self, options: &ProcessBatchOptions) -> Result<BatchSummary, IngestError> {
        let mut candidates = self.feed.fetch_candidates(options.channel_filter.as_deref()).await?;
        if let Some(limit) = options.limit {
            candidates.truncate(limit);
        }

        let state_dir = self.download_dir.join(".ingest-state");
        let resume = Arc::new(
            ResumeState::load(&state_dir)
                .await
                .map_err(|e| IngestError::Internal(format!("failed to load resume state: {e}")))?,
        );

        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut summary = BatchSummary::default();
        let mut tasks = JoinSet::new();

        for episode in candidates {
            let semaphore = Arc::clone(&semaphore);
            let resume = Arc::clone(&resume);
            let orchestrator = self.clone_refs();
            let skip_already_done = options.skip_already_done;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                orchestrator.process_one_guarded(episode, &resume, skip_already_done).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined.expect("ingestion item task panicked") {
                Ok(ItemOutcome::Published(_)) => summary.success += 1,
                Ok(ItemOutcome::Skipped) => summary.skipped += 1,
                Ok(ItemOutcome::Failed(reason)) => {
                    summary.failed += 1;
                    warn!(reason, "ingestion item failed");
                }
                Err(IngestError::QuotaExceeded) => {
                    warn!("quota exceeded, aborting batch");
                    tasks.abort_all();
                    break;
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(error = %e, "ingestion item errored");
                }
            }
        }

        Ok(summary)
    }

    /// Cheap clone of the `Arc`-held collaborators, so each spawned item
    /// task owns its own handle without cloning the whole orchestrator's
    /// `reqwest::Client` by value more than once.
    fn clone_refs(&self) -> Arc<Self> {
        Arc::new(Self {
            feed: Arc::clone(&self.feed),
            asr: Arc::clone(&self.asr),
            translator: Arc::clone(&self.translator),
            object_store: Arc::clone(&self.object_store),
            podcasts: Arc::clone(&self.podcasts),
            http_client: self.http_client.clone(),
            download_dir: self.download_dir.clone(),
            segments_dir: self.segments_dir.clone(),
        })
    }

    async fn process_one_guarded(
        &self,
        episode: Episode,
        resume: &ResumeState,
        skip_already_done: bool,
    ) -> Result<ItemOutcome, IngestError> {
        if skip_already_done && self.podcasts.exists(&episode.id).await? {
            return Ok(ItemOutcome::Skipped);
        }
        match self.process_one(episode, resume).await {
            Ok(outcome) => Ok(outcome),
            Err(IngestError::QuotaExceeded) => Err(IngestError::QuotaExceeded),
            Err(e) => Ok(ItemOutcome::Failed(e.to_string())),
        }
    }

    /// `processOne(item) -> Published | Skipped | Failed` (spec.md §4.1).
    #[instrument(skip(self, resume), fields(episode_id = %episode.id, channel = %episode.channel))]
    pub async fn process_one(&self, mut episode: Episode, resume: &ResumeState) -> Result<ItemOutcome, IngestError> {
        let local_audio_path = self.download_stage(&episode, resume).await?;
        episode.local_audio_path = Some(local_audio_path.clone());

        let segments = self.transcribe_stage(&episode).await?;

        let segments = self.translate_stage(&episode, resume, segments).await?;

        let (audio_key, segments_key) = self.archive_stage(&episode, &local_audio_path, &segments).await?;

        self.publish_stage(&episode, &audio_key, &segments_key, &segments).await?;

        info!("episode published");
        Ok(ItemOutcome::Published(episode.id))
    }

    async fn download_stage(&self, episode: &Episode, resume: &ResumeState) -> Result<String, IngestError> {
        if let Some(path) = resume.downloaded_path(&episode.id).await {
            return Ok(path);
        }

        let mut last_error = IngestError::Transient("download retries exhausted".to_string());
        for attempt in 0..DOWNLOAD_MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
            }
            match self.try_download(episode).await {
                Ok(path) => {
                    resume
                        .mark_downloaded(&episode.id, &path)
                        .await
                        .map_err(|e| IngestError::Internal(format!("failed to persist download state: {e}")))?;
                    return Ok(path);
                }
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    async fn try_download(&self, episode: &Episode) -> Result<String, IngestError> {
        let response = self
            .http_client
            .get(&episode.audio_url)
            .send()
            .await
            .map_err(|e| IngestError::Transient(e.to_string()))?;
        if !response.status().is_success() {
            return Err(IngestError::Transient(format!("download failed with status {}", response.status())));
        }

        let extension = extension_for(&episode.audio_url, response.headers().get("content-type").and_then(|v| v.to_str().ok()));
        let channel_dir = self.download_dir.join(episode.safe_channel());
        tokio::fs::create_dir_all(&channel_dir)
            .await
            .map_err(|e| IngestError::Internal(format!("failed to create download directory: {e}")))?;
        let local_path = channel_dir.join(format!("{}.{extension}", episode.id));

        let bytes = response.bytes().await.map_err(|e| IngestError::Transient(e.to_string()))?;
        tokio::fs::write(&local_path, &bytes)
            .await
            .map_err(|e| IngestError::Internal(format!("failed to write audio file: {e}")))?;

        Ok(local_path.to_string_lossy().into_owned())
    }

    async fn transcribe_stage(&self, episode: &Episode) -> Result<Vec<Segment>, IngestError> {
        if can_skip_transcribe(episode) {
            return Ok(episode.existing_segments.clone().unwrap_or_default());
        }
        let local_audio_path = episode
            .local_audio_path
            .as_deref()
            .expect("download stage always sets local_audio_path before transcribe");
        Ok(self.asr.transcribe(local_audio_path).await?)
    }

    async fn translate_stage(
        &self,
        episode: &Episode,
        resume: &ResumeState,
        mut segments: Vec<Segment>,
    ) -> Result<Vec<Segment>, IngestError> {
        if can_skip_translate(episode) {
            return Ok(segments);
        }

        if let Some(path) = resume.processed_path(&episode.id).await {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| IngestError::Internal(format!("failed to read cached translated segments: {e}")))?;
            return serde_json::from_slice(&bytes)
                .map_err(|e| IngestError::Internal(format!("malformed cached segments file: {e}")));
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let translations = self.translator.translate_batch(&texts, &TranslateOptions::default()).await?;
        for (segment, translation) in segments.iter_mut().zip(translations) {
            segment.translation = Some(translation);
        }

        let local_path = self.segments_dir.join(format!("{}.json", episode.id));
        tokio::fs::create_dir_all(&self.segments_dir)
            .await
            .map_err(|e| IngestError::Internal(format!("failed to create segments directory: {e}")))?;
        let body = segments_to_json(&segments);
        tokio::fs::write(&local_path, body.as_bytes())
            .await
            .map_err(|e| IngestError::Internal(format!("failed to write translated segments: {e}")))?;
        resume
            .mark_processed(&episode.id, &local_path.to_string_lossy())
            .await
            .map_err(|e| IngestError::Internal(format!("failed to persist translate state: {e}")))?;

        Ok(segments)
    }

    async fn archive_stage(
        &self,
        episode: &Episode,
        local_audio_path: &str,
        segments: &[Segment],
    ) -> Result<(String, String), IngestError> {
        let audio_bytes = tokio::fs::read(local_audio_path)
            .await
            .map_err(|e| IngestError::Internal(format!("failed to read downloaded audio: {e}")))?;
        let extension = Path::new(local_audio_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp3");
        let audio_key = audio_key(&episode.channel, episode.timestamp_sec, &episode.id, extension);
        self.object_store.put(&audio_key, audio_bytes, content_type_for(extension)).await?;

        let segments_key = segments_key(&episode.channel, episode.timestamp_sec, &episode.id);
        let body = segments_to_json(segments);
        self.object_store.put(&segments_key, body.into_bytes(), "application/json; charset=utf-8").await?;

        Ok((audio_key, segments_key))
    }

    async fn publish_stage(
        &self,
        episode: &Episode,
        audio_key: &str,
        segments_key: &str,
        segments: &[Segment],
    ) -> Result<(), IngestError> {
        let podcast = PublishedPodcast {
            id: episode.id.clone(),
            company: episode.company.clone(),
            channel: episode.channel.clone(),
            audio_key: audio_key.to_string(),
            segments_key: segments_key.to_string(),
            segment_count: segments.len() as u32,
            title: episode.title.clone(),
            title_translation: episode.title_translation.clone(),
            subtitle: episode.subtitle.clone(),
            timestamp_sec: episode.timestamp_sec,
            language_code: episode.language_code.clone(),
            duration_sec: episode.duration_sec,
            raw_audio_url: episode.audio_url.clone(),
        };
        self.podcasts.upsert(&podcast).await?;
        Ok(())
    }
}

/// Segment JSON as written to disk and object storage: UTF-8, no BOM,
/// `ensure_ascii=false`-equivalent (serde_json is UTF-8 native), 2-space
/// indent (spec.md §4.1, §6).
fn segments_to_json(segments: &[Segment]) -> String {
    serde_json::to_string_pretty(segments).expect("segments are always serializable")
}

fn extension_for(url: &str, content_type: Option<&str>) -> &'static str {
    if let Some(ct) = content_type {
        if ct.contains("mp3") || ct.contains("mpeg") {
            return "mp3";
        }
        if ct.contains("wav") {
            return "wav";
        }
        if ct.contains("m4a") || ct.contains("mp4") {
            return "m4a";
        }
    }
    if url.ends_with(".wav") {
        return "wav";
    }
    if url.ends_with(".m4a") {
        return "m4a";
    }
    "mp3"
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        _ => "audio/mpeg",
    }
}
