//! Translator Engine (M1): mode selection, prompt shaping, batching, the
//! summary pre-pass, sliding window, and reflection (spec.md §4.2).
//!
//! Grounded on `original_source/local/translator/models/base.py`'s
//! `translate_batch` / `_translate_with_summary_and_window` /
//! `_process_batch_results`.

use std::sync::Arc;

use bilingo_core::{CoreError, LlmError, LlmProviderPort};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::prompts;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// Provider-signalled usage exhaustion. Propagated without retry so the
    /// ingestion orchestrator can abort the batch (spec.md §4.1, §7).
    #[error("quota exceeded")]
    QuotaExceeded,

    /// A provider call failed outside the summary+window mode's normal
    /// per-segment tolerance. Triggers the legacy full-context fallback
    /// rather than being swallowed to an empty segment (spec.md §4.2).
    #[error("provider failure: {0}")]
    ProviderFailure(String),
}

impl From<TranslateError> for CoreError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::QuotaExceeded => Self::QuotaExceeded,
            TranslateError::ProviderFailure(msg) => Self::Transient(msg),
        }
    }
}

/// Options for [`TranslatorEngine::translate_batch`], matching the
/// defaults in spec.md §4.2's `translateBatch` signature.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_lang: String,
    pub target_lang: String,
    pub use_reflection: bool,
    pub use_context: bool,
    pub context_window: usize,
    pub use_full_context: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            source_lang: "auto".to_string(),
            target_lang: "zh".to_string(),
            use_reflection: true,
            use_context: true,
            context_window: 2,
            use_full_context: true,
        }
    }
}

/// Long full-text threshold above which the legacy full-context fallback
/// widens its window and omits the full-text block (spec.md §4.2).
const LONG_TEXT_CHARS: usize = 5000;
const LONG_TEXT_WINDOW: usize = 3;
/// Minimum source length (chars) for the reflection two-call protocol.
const REFLECTION_MIN_CHARS: usize = 50;
/// A revision is accepted only if it is at least this fraction of the
/// initial draft's length; shorter revisions are assumed truncated.
const REFLECTION_ACCEPT_RATIO: f64 = 0.8;
const SINGLE_SHOT_CONCURRENCY: usize = 5;
const WINDOW_CONCURRENCY: usize = 5;
const FULL_CONTEXT_CONCURRENCY: usize = 3;
const MAX_LOGGED_FAILURES: usize = 10;
const PLACEHOLDER_SUMMARY: &str = "（无法生成总结，直接翻译）";

pub struct TranslatorEngine {
    provider: Arc<dyn LlmProviderPort>,
}

impl TranslatorEngine {
    #[must_use]
    pub const fn new(provider: Arc<dyn LlmProviderPort>) -> Self {
        Self { provider }
    }

    /// `translateBatch(texts, options) -> translations` (spec.md §4.2).
    /// `len(translations) == len(texts)` always holds; empty source maps
    /// to empty translation; failed/empty results become empty strings
    /// except when the provider signals `QuotaExceeded`, which propagates.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        options: &TranslateOptions,
    ) -> Result<Vec<String>, TranslateError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let results = if !options.use_context || texts.len() == 1 {
            self.translate_single_shot(texts, options).await?
        } else if options.use_full_context {
            let full_text = texts.join(" ");
            info!(
                segments = texts.len(),
                full_text_chars = full_text.chars().count(),
                "translating with summary+sliding-window mode"
            );
            match self.translate_summary_and_window(texts, &full_text, options).await {
                Ok(results) => results,
                Err(TranslateError::QuotaExceeded) => return Err(TranslateError::QuotaExceeded),
                Err(TranslateError::ProviderFailure(msg)) => {
                    warn!(
                        error = %msg,
                        "summary+sliding-window translation failed; falling back to legacy full-context mode"
                    );
                    self.translate_full_context_fallback(texts, &full_text).await?
                }
            }
        } else {
            self.translate_sliding_window(texts, options).await?
        };

        Ok(self.account_for_results(results, texts))
    }

    async fn translate_single_shot(
        &self,
        texts: &[String],
        options: &TranslateOptions,
    ) -> Result<Vec<Option<String>>, TranslateError> {
        let semaphore = Arc::new(Semaphore::new(SINGLE_SHOT_CONCURRENCY));
        let mut tasks = JoinSet::new();
        for (idx, text) in texts.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let text = text.clone();
            let use_reflection = options.use_reflection;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = translate_single(&provider, &text, use_reflection).await;
                (idx, result)
            });
        }
        collect_indexed(tasks, texts.len()).await
    }

    async fn translate_sliding_window(
        &self,
        texts: &[String],
        options: &TranslateOptions,
    ) -> Result<Vec<Option<String>>, TranslateError> {
        let semaphore = Arc::new(Semaphore::new(FULL_CONTEXT_CONCURRENCY));
        let mut tasks = JoinSet::new();
        for idx in 0..texts.len() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let (before, focus, after) = window_slices(texts, idx, options.context_window);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = if focus.trim().is_empty() {
                    Ok(String::new())
                } else {
                    let prompt = prompts::build_context_prompt(&focus, &before, &after);
                    call(&provider, &prompt).await
                };
                (idx, result)
            });
        }
        collect_indexed(tasks, texts.len()).await
    }

    /// Preferred long-text strategy: one summary call, then concurrent
    /// per-segment calls carrying the summary plus a sliding window. Unlike
    /// the other modes, a per-segment provider failure here is not
    /// swallowed — it propagates so the caller can fall back to the legacy
    /// full-context path instead of silently degrading this preferred mode.
    async fn translate_summary_and_window(
        &self,
        texts: &[String],
        full_text: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<Option<String>>, TranslateError> {
        let summary_prompt = prompts::build_summary_prompt(full_text);
        let summary = match call(&self.provider, &summary_prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => PLACEHOLDER_SUMMARY.to_string(),
            Err(TranslateError::QuotaExceeded) => return Err(TranslateError::QuotaExceeded),
        };

        let semaphore = Arc::new(Semaphore::new(WINDOW_CONCURRENCY));
        let mut tasks = JoinSet::new();
        for idx in 0..texts.len() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let summary = summary.clone();
            let (before, focus, after) = window_slices(texts, idx, options.context_window);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = if focus.trim().is_empty() {
                    Ok(String::new())
                } else {
                    let prompt = prompts::build_sliding_window_prompt(&focus, &summary, &before, &after);
                    call_strict(&provider, &prompt).await
                };
                (idx, result)
            });
        }
        collect_indexed(tasks, texts.len()).await
    }

    /// Legacy fallback for the full-context path, used when the
    /// summary+window mode above fails a segment: sends the whole text as
    /// background per segment, widening to a ±3 sliding window above
    /// [`LONG_TEXT_CHARS`] to avoid prompt bloat (spec.md §4.2).
    async fn translate_full_context_fallback(
        &self,
        texts: &[String],
        full_text: &str,
    ) -> Result<Vec<Option<String>>, TranslateError> {
        let semaphore = Arc::new(Semaphore::new(FULL_CONTEXT_CONCURRENCY));
        let long = full_text.chars().count() > LONG_TEXT_CHARS;
        let mut tasks = JoinSet::new();
        for idx in 0..texts.len() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let full_text = full_text.to_string();
            let focus = texts[idx].clone();
            let (before, _, after) = window_slices(texts, idx, LONG_TEXT_WINDOW);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let result = if focus.trim().is_empty() {
                    Ok(String::new())
                } else if long {
                    let prompt = prompts::build_context_prompt(&focus, &before, &after);
                    call(&provider, &prompt).await
                } else {
                    let prompt = prompts::build_full_context_prompt(&focus, &full_text);
                    call(&provider, &prompt).await
                };
                (idx, result)
            });
        }
        collect_indexed(tasks, texts.len()).await
    }

    /// Logs the success ratio and the first ≤10 failed indices, then
    /// collapses the per-segment results to plain strings (spec.md §4.2:
    /// "result accounting").
    fn account_for_results(&self, results: Vec<Option<String>>, texts: &[String]) -> Vec<String> {
        let total = texts.len();
        let mut success = 0usize;
        let mut failed_indices = Vec::new();
        let translations: Vec<String> = results
            .into_iter()
            .enumerate()
            .map(|(idx, result)| match result {
                Some(text) if !text.trim().is_empty() => {
                    success += 1;
                    text
                }
                _ => {
                    failed_indices.push(idx);
                    String::new()
                }
            })
            .collect();

        info!(success, total, "translation batch complete");
        if !failed_indices.is_empty() {
            let shown = &failed_indices[..failed_indices.len().min(MAX_LOGGED_FAILURES)];
            warn!(failed_indices = ?shown, truncated = failed_indices.len() > MAX_LOGGED_FAILURES, "segments failed to translate");
        }
        translations
    }
}

/// Translates one segment for the single-shot mode, running the
/// reflection two-call protocol when enabled and the source is long
/// enough to benefit from it.
async fn translate_single(
    provider: &Arc<dyn LlmProviderPort>,
    text: &str,
    use_reflection: bool,
) -> Result<String, TranslateError> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }

    let initial = call(provider, &prompts::build_simple_prompt(text)).await?;
    if !use_reflection || text.chars().count() < REFLECTION_MIN_CHARS {
        return Ok(initial);
    }

    let optimized = call(provider, &prompts::build_reflection_prompt(text, &initial)).await?;
    let accepted = !optimized.is_empty()
        && (optimized.chars().count() as f64) >= REFLECTION_ACCEPT_RATIO * (initial.chars().count() as f64);
    Ok(if accepted { optimized } else { initial })
}

/// Calls the provider, mapping every error except `QuotaExceeded` to an
/// empty string: ordinary failures are persisted as empty translations
/// and counted in telemetry rather than failing the item (spec.md §4.1).
async fn call(provider: &Arc<dyn LlmProviderPort>, prompt: &str) -> Result<String, TranslateError> {
    match provider.call(prompt).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(LlmError::QuotaExceeded) => Err(TranslateError::QuotaExceeded),
        Err(_) => Ok(String::new()),
    }
}

/// Like [`call`], but a non-quota provider failure propagates as
/// [`TranslateError::ProviderFailure`] instead of degrading to an empty
/// segment. Used by the summary+window mode so a struggling provider
/// triggers the legacy full-context fallback rather than silently
/// returning partial translations from the preferred mode.
async fn call_strict(provider: &Arc<dyn LlmProviderPort>, prompt: &str) -> Result<String, TranslateError> {
    match provider.call(prompt).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(LlmError::QuotaExceeded) => Err(TranslateError::QuotaExceeded),
        Err(e) => Err(TranslateError::ProviderFailure(e.to_string())),
    }
}

/// Pre/post context windows of `texts` around `idx`, each joined with
/// spaces, plus the focus segment itself.
fn window_slices(texts: &[String], idx: usize, window: usize) -> (String, String, String) {
    let start = idx.saturating_sub(window);
    let end = (idx + window + 1).min(texts.len());
    let before = texts[start..idx].join(" ");
    let after = texts[idx + 1..end].join(" ");
    (before, texts[idx].clone(), after)
}

async fn collect_indexed(
    mut tasks: JoinSet<(usize, Result<String, TranslateError>)>,
    len: usize,
) -> Result<Vec<Option<String>>, TranslateError> {
    let mut slots: Vec<Option<String>> = vec![None; len];
    while let Some(joined) = tasks.join_next().await {
        let (idx, result) = joined.expect("translation task panicked");
        match result {
            Ok(text) => slots[idx] = Some(text),
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProvider {
        calls: AtomicUsize,
        responses: Mutex<Vec<Result<String, LlmError>>>,
    }

    impl StubProvider {
        fn always(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(vec![Ok(text.to_string())]),
            }
        }

        fn sequence(responses: Vec<Result<String, LlmError>>) -> Self {
            Self { calls: AtomicUsize::new(0), responses: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl LlmProviderPort for StubProvider {
        async fn call(&self, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                match &responses[0] {
                    Ok(text) => Ok(text.clone()),
                    Err(LlmError::QuotaExceeded) => Err(LlmError::QuotaExceeded),
                    Err(_) => Ok(String::new()),
                }
            }
        }
    }

    #[tokio::test]
    async fn preserves_length_and_empty_source_maps_to_empty() {
        let engine = TranslatorEngine::new(Arc::new(StubProvider::always("你好")));
        let texts = vec!["hi".to_string(), String::new(), "world".to_string()];
        let out = engine
            .translate_batch(&texts, &TranslateOptions { use_full_context: false, use_context: false, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], "");
    }

    #[tokio::test]
    async fn single_shot_mode_used_for_single_segment() {
        let engine = TranslatorEngine::new(Arc::new(StubProvider::always("你好")));
        let texts = vec!["only one segment here, long enough for reflection to trigger".to_string()];
        let out = engine.translate_batch(&texts, &TranslateOptions::default()).await.unwrap();
        assert_eq!(out, vec!["你好".to_string()]);
    }

    #[tokio::test]
    async fn reflection_keeps_initial_when_revision_is_too_short() {
        let provider = StubProvider::sequence(vec![
            Ok("a reasonably long initial translation that passes the length gate".to_string()),
            Ok("short".to_string()),
        ]);
        let text = "a".repeat(60);
        let out = translate_single(&(Arc::new(provider) as Arc<dyn LlmProviderPort>), &text, true)
            .await
            .unwrap();
        assert_eq!(out, "a reasonably long initial translation that passes the length gate");
    }

    #[tokio::test]
    async fn short_source_skips_reflection_call() {
        let provider = Arc::new(StubProvider::always("短"));
        let out = translate_single(&(provider.clone() as Arc<dyn LlmProviderPort>), "short", true)
            .await
            .unwrap();
        assert_eq!(out, "短");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quota_exceeded_propagates_without_swallowing() {
        let engine = TranslatorEngine::new(Arc::new(StubProvider::sequence(vec![Err(LlmError::QuotaExceeded)])));
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = engine
            .translate_batch(&texts, &TranslateOptions { use_context: false, ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::QuotaExceeded));
    }

    #[tokio::test]
    async fn a_failing_window_call_falls_back_to_legacy_full_context_mode() {
        // First call is the summary (succeeds), second is the one window
        // call for "only segment" (fails with a non-quota error), after
        // which translate_batch must retry via the legacy full-context path.
        let provider = StubProvider::sequence(vec![
            Ok("summary".to_string()),
            Err(LlmError::Transient("boom".to_string())),
            Ok("翻译".to_string()),
        ]);
        let engine = TranslatorEngine::new(Arc::new(provider));
        let texts = vec!["only segment".to_string(), "second segment".to_string()];
        let out = engine.translate_batch(&texts, &TranslateOptions::default()).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn summary_and_window_mode_preserves_order() {
        let engine = TranslatorEngine::new(Arc::new(StubProvider::always("翻译")));
        let texts = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let out = engine.translate_batch(&texts, &TranslateOptions::default()).await.unwrap();
        assert_eq!(out, vec!["翻译".to_string(), "翻译".to_string(), "翻译".to_string()]);
    }
}
