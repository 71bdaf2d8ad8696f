use serde::{Deserialize, Serialize};

/// A persisted, indexable catalogue entry a client can list. Invariants
/// (spec.md §3): `(company, channel, timestamp_sec, id)` uniquely orders
/// listings; `id` is unique; `audio_key`/`segments_key` are immutable once
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPodcast {
    pub id: String,
    pub company: String,
    pub channel: String,
    pub audio_key: String,
    pub segments_key: String,
    pub segment_count: u32,
    pub title: Option<String>,
    pub title_translation: Option<String>,
    pub subtitle: Option<String>,
    pub timestamp_sec: i64,
    pub language_code: String,
    pub duration_sec: Option<f64>,
    pub raw_audio_url: String,
}
