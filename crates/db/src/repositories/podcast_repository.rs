//! `SQLite` implementation of `PodcastRepository`.

use async_trait::async_trait;
use bilingo_core::{PodcastRepository, PublishedPodcast, RepositoryError};
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = "id, company, channel, audio_key, segments_key, segment_count, \
    title, title_translation, subtitle, timestamp_sec, language_code, duration_sec, raw_audio_url";

pub struct SqlitePodcastRepository {
    pool: SqlitePool,
}

impl SqlitePodcastRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_podcast(row: &sqlx::sqlite::SqliteRow) -> PublishedPodcast {
    PublishedPodcast {
        id: row.get("id"),
        company: row.get("company"),
        channel: row.get("channel"),
        audio_key: row.get("audio_key"),
        segments_key: row.get("segments_key"),
        segment_count: row.get::<i64, _>("segment_count") as u32,
        title: row.get("title"),
        title_translation: row.get("title_translation"),
        subtitle: row.get("subtitle"),
        timestamp_sec: row.get("timestamp_sec"),
        language_code: row.get("language_code"),
        duration_sec: row.get("duration_sec"),
        raw_audio_url: row.get("raw_audio_url"),
    }
}

#[async_trait]
impl PodcastRepository for SqlitePodcastRepository {
    async fn upsert(&self, podcast: &PublishedPodcast) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO podcasts (
                id, company, channel, audio_key, segments_key, segment_count,
                title, title_translation, subtitle, timestamp_sec, language_code,
                duration_sec, raw_audio_url, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                title_translation = excluded.title_translation,
                subtitle = excluded.subtitle,
                duration_sec = excluded.duration_sec,
                segment_count = excluded.segment_count,
                updated_at = datetime('now')
            "#,
        )
        .bind(&podcast.id)
        .bind(&podcast.company)
        .bind(&podcast.channel)
        .bind(&podcast.audio_key)
        .bind(&podcast.segments_key)
        .bind(i64::from(podcast.segment_count))
        .bind(&podcast.title)
        .bind(&podcast.title_translation)
        .bind(&podcast.subtitle)
        .bind(podcast.timestamp_sec)
        .bind(&podcast.language_code)
        .bind(podcast.duration_sec)
        .bind(&podcast.raw_audio_url)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<PublishedPodcast, RepositoryError> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM podcasts WHERE id = ?");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?
            .ok_or_else(|| RepositoryError::NotFound(format!("podcast {id}")))?;
        Ok(row_to_podcast(&row))
    }

    async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as c FROM podcasts WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let count: i64 = row.get("c");
        Ok(count > 0)
    }

    async fn list_channels(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT company, channel FROM podcasts ORDER BY company, channel",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|r| (r.get("company"), r.get("channel")))
            .collect())
    }

    async fn list_dates(&self, company: &str, channel: &str) -> Result<Vec<i64>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT (timestamp_sec - (timestamp_sec % 86400)) as day_start \
             FROM podcasts WHERE company = ? AND channel = ? ORDER BY day_start DESC",
        )
        .bind(company)
        .bind(channel)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(rows.iter().map(|r| r.get("day_start")).collect())
    }

    async fn list_by_day(
        &self,
        company: &str,
        channel: &str,
        day_start: i64,
    ) -> Result<Vec<PublishedPodcast>, RepositoryError> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM podcasts \
             WHERE company = ? AND channel = ? AND timestamp_sec >= ? AND timestamp_sec < ? \
             ORDER BY timestamp_sec DESC"
        );
        let rows = sqlx::query(&query)
            .bind(company)
            .bind(channel)
            .bind(day_start)
            .bind(day_start + 86400)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(rows.iter().map(row_to_podcast).collect())
    }

    async fn list_paged(
        &self,
        company: &str,
        channel: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<PublishedPodcast>, u64), RepositoryError> {
        let total_row = sqlx::query("SELECT COUNT(*) as c FROM podcasts WHERE company = ? AND channel = ?")
            .bind(company)
            .bind(channel)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let total: i64 = total_row.get("c");

        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM podcasts WHERE company = ? AND channel = ? \
             ORDER BY timestamp_sec DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&query)
            .bind(company)
            .bind(channel)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok((rows.iter().map(row_to_podcast).collect(), total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    fn podcast(id: &str, ts: i64) -> PublishedPodcast {
        PublishedPodcast {
            id: id.to_string(),
            company: "acme".into(),
            channel: "news".into(),
            audio_key: format!("audio/{id}.mp3"),
            segments_key: format!("segments/{id}.json"),
            segment_count: 3,
            title: Some("T".into()),
            title_translation: None,
            subtitle: None,
            timestamp_sec: ts,
            language_code: "en".into(),
            duration_sec: Some(120.0),
            raw_audio_url: "http://x/a.mp3".into(),
        }
    }

    #[tokio::test]
    async fn upsert_then_paged_list_orders_by_timestamp_desc_id_desc() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePodcastRepository::new(pool);
        repo.upsert(&podcast("a", 100)).await.unwrap();
        repo.upsert(&podcast("b", 200)).await.unwrap();
        repo.upsert(&podcast("c", 300)).await.unwrap();

        let (rows, total) = repo.list_paged("acme", "news", 1, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "c");
        assert_eq!(rows[1].id, "b");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_id() {
        let pool = setup_test_database().await.unwrap();
        let repo = SqlitePodcastRepository::new(pool);
        repo.upsert(&podcast("a", 100)).await.unwrap();
        let mut updated = podcast("a", 100);
        updated.title = Some("New Title".into());
        repo.upsert(&updated).await.unwrap();

        let fetched = repo.get_by_id("a").await.unwrap();
        assert_eq!(fetched.title.as_deref(), Some("New Title"));
        let (_, total) = repo.list_paged("acme", "news", 1, 10).await.unwrap();
        assert_eq!(total, 1);
    }
}
