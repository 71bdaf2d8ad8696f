use std::sync::Arc;

use crate::domain::PublishedPodcast;
use crate::ports::{CoreError, ObjectStorePort, PodcastRepository, RepositoryError};

/// A catalogue row as returned to clients, with `is_free` resolved against
/// the "latest-is-free" projection (spec.md §4.4).
#[derive(Debug, Clone, serde::Serialize)]
pub struct PodcastSummary {
    #[serde(flatten)]
    pub podcast: PublishedPodcast,
    pub is_free: bool,
}

/// Full podcast detail with freshly-signed playback URLs replacing the raw
/// object-store keys.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PodcastDetail {
    #[serde(flatten)]
    pub podcast: PublishedPodcast,
    pub is_free: bool,
    pub audio_url: String,
    pub segments_url: String,
}

/// Catalogue Service (H3) business logic over the Catalogue Store (M4).
pub struct CatalogueService {
    repo: Arc<dyn PodcastRepository>,
    object_store: Arc<dyn ObjectStorePort>,
}

impl CatalogueService {
    #[must_use]
    pub const fn new(repo: Arc<dyn PodcastRepository>, object_store: Arc<dyn ObjectStorePort>) -> Self {
        Self { repo, object_store }
    }

    pub async fn list_channels(&self) -> Result<Vec<(String, String)>, CoreError> {
        Ok(self.repo.list_channels().await?)
    }

    pub async fn list_dates(&self, company: &str, channel: &str) -> Result<Vec<i64>, CoreError> {
        Ok(self.repo.list_dates(company, channel).await?)
    }

    pub async fn list_by_day(
        &self,
        company: &str,
        channel: &str,
        day_start: i64,
    ) -> Result<Vec<PodcastSummary>, CoreError> {
        let rows = self.repo.list_by_day(company, channel, day_start).await?;
        let latest_id = self.latest_id(company, channel).await?;
        Ok(rows
            .into_iter()
            .map(|podcast| {
                let is_free = latest_id.as_deref() == Some(podcast.id.as_str());
                PodcastSummary { podcast, is_free }
            })
            .collect())
    }

    pub async fn list_paged(
        &self,
        company: &str,
        channel: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<PodcastSummary>, u64), CoreError> {
        if !(1..=200).contains(&limit) {
            return Err(CoreError::Validation("limit must be in [1,200]".to_string()));
        }
        if page < 1 {
            return Err(CoreError::Validation("page must be >= 1".to_string()));
        }
        let (rows, total) = self.repo.list_paged(company, channel, page, limit).await?;
        let summaries = rows
            .into_iter()
            .enumerate()
            .map(|(idx, podcast)| {
                // Only the first row of page 1 is ever the channel's maximal
                // row, since listing order is (timestamp_sec DESC, id DESC).
                let is_free = page == 1 && idx == 0;
                PodcastSummary { podcast, is_free }
            })
            .collect();
        Ok((summaries, total))
    }

    pub async fn detail(&self, id: &str, expires_seconds: u32) -> Result<PodcastDetail, CoreError> {
        if !(60..=3600).contains(&expires_seconds) {
            return Err(CoreError::Validation("expires must be in [60,3600]".to_string()));
        }
        let podcast = match self.repo.get_by_id(id).await {
            Ok(p) => p,
            Err(RepositoryError::NotFound(msg)) => return Err(CoreError::Validation(msg)),
            Err(e) => return Err(e.into()),
        };
        let latest_id = self.latest_id(&podcast.company, &podcast.channel).await?;
        let is_free = latest_id.as_deref() == Some(podcast.id.as_str());
        let audio_url = self.object_store.sign_url(&podcast.audio_key, expires_seconds);
        let segments_url = self.object_store.sign_url(&podcast.segments_key, expires_seconds);
        Ok(PodcastDetail {
            podcast,
            is_free,
            audio_url,
            segments_url,
        })
    }

    pub async fn exists(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.repo.exists(id).await?)
    }

    /// The id of the row whose `(timestamp_sec, id)` is maximal for the
    /// channel, i.e. the first row of the page-1 listing.
    async fn latest_id(&self, company: &str, channel: &str) -> Result<Option<String>, CoreError> {
        let (rows, _total) = self.repo.list_paged(company, channel, 1, 1).await?;
        Ok(rows.into_iter().next().map(|p| p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ObjectStoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockRepo {
        rows: Mutex<Vec<PublishedPodcast>>,
    }

    fn row(id: &str, ts: i64) -> PublishedPodcast {
        PublishedPodcast {
            id: id.to_string(),
            company: "acme".into(),
            channel: "news".into(),
            audio_key: format!("audio/{id}"),
            segments_key: format!("segments/{id}"),
            segment_count: 1,
            title: None,
            title_translation: None,
            subtitle: None,
            timestamp_sec: ts,
            language_code: "en".into(),
            duration_sec: None,
            raw_audio_url: "http://x".into(),
        }
    }

    #[async_trait]
    impl PodcastRepository for MockRepo {
        async fn upsert(&self, podcast: &PublishedPodcast) -> Result<(), RepositoryError> {
            self.rows.lock().unwrap().push(podcast.clone());
            Ok(())
        }
        async fn get_by_id(&self, id: &str) -> Result<PublishedPodcast, RepositoryError> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
        }
        async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
            Ok(self.rows.lock().unwrap().iter().any(|p| p.id == id))
        }
        async fn list_channels(&self) -> Result<Vec<(String, String)>, RepositoryError> {
            Ok(vec![("acme".into(), "news".into())])
        }
        async fn list_dates(&self, _c: &str, _ch: &str) -> Result<Vec<i64>, RepositoryError> {
            Ok(vec![])
        }
        async fn list_by_day(
            &self,
            _c: &str,
            _ch: &str,
            _day_start: i64,
        ) -> Result<Vec<PublishedPodcast>, RepositoryError> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.timestamp_sec.cmp(&a.timestamp_sec));
            Ok(rows)
        }
        async fn list_paged(
            &self,
            _c: &str,
            _ch: &str,
            page: u32,
            limit: u32,
        ) -> Result<(Vec<PublishedPodcast>, u64), RepositoryError> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.timestamp_sec.cmp(&a.timestamp_sec).then(b.id.cmp(&a.id)));
            let total = rows.len() as u64;
            let start = ((page - 1) * limit) as usize;
            let page_rows = rows.into_iter().skip(start).take(limit as usize).collect();
            Ok((page_rows, total))
        }
    }

    struct MockObjectStore;

    #[async_trait]
    impl ObjectStorePort for MockObjectStore {
        async fn put(&self, _key: &str, _bytes: Vec<u8>, _ct: &str) -> Result<(), ObjectStoreError> {
            Ok(())
        }
        fn sign_url(&self, key: &str, expires_seconds: u32) -> String {
            format!("https://cdn.example/{key}?expires={expires_seconds}")
        }
    }

    fn service(rows: Vec<PublishedPodcast>) -> CatalogueService {
        CatalogueService::new(
            Arc::new(MockRepo { rows: Mutex::new(rows) }),
            Arc::new(MockObjectStore),
        )
    }

    #[tokio::test]
    async fn latest_is_free_marks_exactly_one_row() {
        let svc = service(vec![row("a", 100), row("b", 200), row("c", 300)]);
        let (summaries, total) = svc.list_paged("acme", "news", 1, 200).await.unwrap();
        assert_eq!(total, 3);
        let free: Vec<_> = summaries.iter().filter(|s| s.is_free).collect();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].podcast.id, "c");
    }

    #[tokio::test]
    async fn detail_rejects_expires_out_of_bounds() {
        let svc = service(vec![row("a", 100)]);
        assert!(svc.detail("a", 59).await.is_err());
        assert!(svc.detail("a", 3601).await.is_err());
        assert!(svc.detail("a", 60).await.is_ok());
    }

    #[tokio::test]
    async fn list_paged_rejects_limit_out_of_bounds() {
        let svc = service(vec![row("a", 100)]);
        assert!(svc.list_paged("acme", "news", 1, 0).await.is_err());
        assert!(svc.list_paged("acme", "news", 1, 201).await.is_err());
    }
}
