//! Feed normalization port (SPEC_FULL.md §4.5). Feed/RSS parsing itself is
//! out of scope (spec.md §1: "assumed to yield normalized episode
//! records"); this defines the seam the orchestrator pulls candidates
//! through, plus the `FeedSource`-aware skip that lets NCE/VOA/book/SRT
//! feeds bypass ASR and/or translation without changing pipeline order or
//! the resume-state contract.

use async_trait::async_trait;
use bilingo_core::Episode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transient feed error: {0}")]
    Transient(String),
    #[error("internal feed error: {0}")]
    Internal(String),
}

/// Supplies already-normalized [`Episode`] candidates for a batch. A real
/// adapter wraps an RSS reader, a scraper, or a directory walk; this crate
/// only consumes the port.
#[async_trait]
pub trait FeedClientPort: Send + Sync {
    async fn fetch_candidates(&self, channel_filter: Option<&str>) -> Result<Vec<Episode>, FeedError>;
}

/// Whether an episode's existing segments satisfy the ASR stage without
/// calling the adapter (SPEC_FULL.md §4.5: sources with a builtin
/// transcript skip straight to translate).
#[must_use]
pub fn can_skip_transcribe(episode: &Episode) -> bool {
    episode.source.has_builtin_transcript() && episode.existing_segments.is_some()
}

/// Whether an episode's existing segments already carry translations,
/// letting the orchestrator skip the Translator Engine entirely.
#[must_use]
pub fn can_skip_translate(episode: &Episode) -> bool {
    episode.source.has_builtin_translation()
        && episode
            .existing_segments
            .as_ref()
            .is_some_and(|segments| segments.iter().all(|s| s.translation.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bilingo_core::{FeedSource, Segment};

    fn episode_with(source: FeedSource, segments: Option<Vec<Segment>>) -> Episode {
        let mut ep = Episode::new("Acme".into(), "News".into(), "http://x/a.mp3".into(), None, 0, source);
        ep.existing_segments = segments;
        ep
    }

    #[test]
    fn nce_with_transcript_skips_asr_but_not_translate() {
        let seg = Segment::new(0, 0.0, 1.0, "hello".into());
        let ep = episode_with(FeedSource::Nce, Some(vec![seg]));
        assert!(can_skip_transcribe(&ep));
        assert!(!can_skip_translate(&ep));
    }

    #[test]
    fn bilingual_srt_with_translations_skips_both_stages() {
        let mut seg = Segment::new(0, 0.0, 1.0, "hello".into());
        seg.translation = Some("你好".into());
        let ep = episode_with(FeedSource::BilingualSrt, Some(vec![seg]));
        assert!(can_skip_transcribe(&ep));
        assert!(can_skip_translate(&ep));
    }

    #[test]
    fn podcast_without_existing_segments_skips_neither_stage() {
        let ep = episode_with(FeedSource::Podcast, None);
        assert!(!can_skip_transcribe(&ep));
        assert!(!can_skip_translate(&ep));
    }
}
