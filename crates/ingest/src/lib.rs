//! Ingestion pipeline (H1, L2, L3 in spec.md §2): feed normalization,
//! the ASR adapter, the content-addressed object-store client, and the
//! resumable per-item orchestrator.

mod asr;
mod error;
mod feed;
mod feed_adapter;
mod objectstore;
mod orchestrator;
mod resume;
mod store_adapter;

pub use asr::{AsrConfig, HttpAsrAdapter};
pub use error::IngestError;
pub use feed::{can_skip_transcribe, can_skip_translate, FeedClientPort, FeedError};
pub use feed_adapter::{FeedClientConfig, HttpFeedClient};
pub use objectstore::{audio_key, safe_channel, segments_key, sign_url};
pub use orchestrator::{BatchSummary, IngestionOrchestrator, ItemOutcome, ProcessBatchOptions};
pub use resume::ResumeState;
pub use store_adapter::{HttpObjectStore, ObjectStoreConfig};
