use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Segment;

/// The variant of external feed an episode came from. Sources that already
/// carry a transcript or a translation let the orchestrator skip the
/// corresponding pipeline stage (`SPEC_FULL.md` §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// Generic podcast/RSS feed; audio is transcribed by the ASR adapter.
    Podcast,
    /// VOA Learning English; an HTML transcript is scraped alongside the
    /// audio and preferred over ASR when present.
    Voa,
    /// New Concept English; lesson audio ships with an authoritative
    /// transcript, never ASR'd.
    Nce,
    /// Ebook chapter rendered to speech; transcript is the source text.
    Book,
    /// Pre-translated bilingual subtitle file; both transcript and
    /// translation are already present.
    BilingualSrt,
}

impl FeedSource {
    /// Whether this source supplies its own transcript, bypassing ASR.
    #[must_use]
    pub const fn has_builtin_transcript(self) -> bool {
        !matches!(self, Self::Podcast)
    }

    /// Whether this source supplies its own per-segment translation,
    /// bypassing the translator engine.
    #[must_use]
    pub const fn has_builtin_translation(self) -> bool {
        matches!(self, Self::BilingualSrt)
    }
}

/// An ingestion working record. Lives only in ingestion-local state; once
/// published it is discarded in favour of the `PublishedPodcast` row plus
/// object-store objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub company: String,
    pub channel: String,
    pub audio_url: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub timestamp_sec: i64,
    pub language_code: String,
    pub source: FeedSource,
    pub duration_sec: Option<f64>,
    pub local_audio_path: Option<String>,
    pub local_segments_path: Option<String>,
    pub title_translation: Option<String>,
    /// Segments supplied directly by the feed (NCE/bilingual SRT/VOA),
    /// bypassing the ASR stage when present.
    pub existing_segments: Option<Vec<Segment>>,
}

impl Episode {
    /// Constructs an episode, deriving its content-addressed `id` per
    /// `episode_id`.
    #[must_use]
    pub fn new(
        company: String,
        channel: String,
        audio_url: String,
        title: Option<String>,
        timestamp_sec: i64,
        source: FeedSource,
    ) -> Self {
        let id = episode_id(&company, &channel, timestamp_sec, &audio_url, title.as_deref());
        Self {
            id,
            company,
            channel,
            audio_url,
            title,
            subtitle: None,
            timestamp_sec,
            language_code: "en".to_string(),
            source,
            duration_sec: None,
            local_audio_path: None,
            local_segments_path: None,
            title_translation: None,
            existing_segments: None,
        }
    }

    /// Channel name with `/`, `\`, and space replaced by `_`, used as the
    /// object-store key path component (spec.md §4.1).
    #[must_use]
    pub fn safe_channel(&self) -> String {
        self.channel.replace(['/', '\\', ' '], "_")
    }
}

/// Deterministic content hash identifying an episode: the first 32 hex
/// chars of SHA-256 over
/// `lower(company)|lower(channel)|timestamp|trim(audioURL)|lower(title)`.
///
/// Grounded bit-for-bit on `original_source/server/database.py::_generate_id`.
#[must_use]
pub fn episode_id(
    company: &str,
    channel: &str,
    timestamp_sec: i64,
    audio_url: &str,
    title: Option<&str>,
) -> String {
    let normalized_company = company.trim().to_lowercase();
    let normalized_channel = channel.trim().to_lowercase();
    let normalized_title = title.unwrap_or("").trim().to_lowercase();
    let normalized_url = audio_url.trim();

    let content = format!(
        "{normalized_company}|{normalized_channel}|{timestamp_sec}|{normalized_url}|{normalized_title}"
    );
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_id_matches_known_vector() {
        // Mirrors the normalization rules of the original id generator:
        // lowercased/trimmed company+channel+title, trimmed (not lowered) url.
        let id = episode_id("NPR", "Up First", 1_700_000_000, " https://x/a.mp3 ", Some(" Title "));
        let expected_content = "npr|up first|1700000000|https://x/a.mp3|title";
        let digest = Sha256::digest(expected_content.as_bytes());
        let expected = hex::encode(digest)[..32].to_string();
        assert_eq!(id, expected);
        assert_eq!(id.len(), 32);
    }

    #[test]
    fn episode_id_is_stable_for_same_content() {
        let a = episode_id("Acme", "News", 100, "http://x", Some("t"));
        let b = episode_id("acme", "news", 100, "http://x", Some("T"));
        assert_eq!(a, b, "company/channel/title normalization must be case-insensitive");
    }

    #[test]
    fn safe_channel_replaces_path_unsafe_characters() {
        let ep = Episode::new(
            "Acme".into(),
            "Daily/News Hour\\2".into(),
            "http://x/a.mp3".into(),
            None,
            0,
            FeedSource::Podcast,
        );
        assert_eq!(ep.safe_channel(), "Daily_News_Hour_2");
    }

    #[test]
    fn bilingual_srt_skips_both_asr_and_translation() {
        assert!(FeedSource::BilingualSrt.has_builtin_transcript());
        assert!(FeedSource::BilingualSrt.has_builtin_translation());
        assert!(!FeedSource::Podcast.has_builtin_transcript());
        assert!(!FeedSource::Podcast.has_builtin_translation());
    }
}
