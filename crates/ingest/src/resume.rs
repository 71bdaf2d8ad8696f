//! Resume discipline (spec.md §4.1): two persisted maps keyed by
//! `episodeID` — `downloaded{id -> localAudioPath}` and
//! `processed{id -> localSegmentsPath}`. Each successful stage writes its
//! entry and fsync-commits the backing file before the next stage begins,
//! so a restart re-enters at the earliest stage whose key is absent.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct MapFile {
    #[serde(flatten)]
    entries: HashMap<String, String>,
}

struct PersistedMap {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl PersistedMap {
    async fn load(path: PathBuf) -> io::Result<Self> {
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<MapFile>(&bytes).unwrap_or_default().entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, entries })
    }

    async fn insert_and_flush(&mut self, id: String, value: String) -> io::Result<()> {
        self.entries.insert(id, value);
        let body = serde_json::to_vec_pretty(&MapFile { entries: self.entries.clone() })
            .expect("resume map is always serializable");
        let mut file = File::create(&self.path).await?;
        file.write_all(&body).await?;
        file.sync_all().await
    }
}

/// Tracks the two resume maps for one batch, guarded by an internal mutex
/// since multiple concurrent items mutate them independently (spec.md §5:
/// "Shared per-batch state ... mutated only under a dedicated mutex").
pub struct ResumeState {
    downloaded: Mutex<PersistedMap>,
    processed: Mutex<PersistedMap>,
}

impl ResumeState {
    pub async fn load(state_dir: &Path) -> io::Result<Self> {
        tokio::fs::create_dir_all(state_dir).await?;
        Ok(Self {
            downloaded: Mutex::new(PersistedMap::load(state_dir.join("downloaded.json")).await?),
            processed: Mutex::new(PersistedMap::load(state_dir.join("processed.json")).await?),
        })
    }

    pub async fn downloaded_path(&self, episode_id: &str) -> Option<String> {
        self.downloaded.lock().await.entries.get(episode_id).cloned()
    }

    pub async fn mark_downloaded(&self, episode_id: &str, local_path: &str) -> io::Result<()> {
        self.downloaded.lock().await.insert_and_flush(episode_id.to_string(), local_path.to_string()).await
    }

    pub async fn processed_path(&self, episode_id: &str) -> Option<String> {
        self.processed.lock().await.entries.get(episode_id).cloned()
    }

    pub async fn mark_processed(&self, episode_id: &str, local_path: &str) -> io::Result<()> {
        self.processed.lock().await.insert_and_flush(episode_id.to_string(), local_path.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restart_resumes_from_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let state = ResumeState::load(dir.path()).await.unwrap();
            state.mark_downloaded("ep1", "/tmp/ep1.mp3").await.unwrap();
        }
        let reloaded = ResumeState::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.downloaded_path("ep1").await, Some("/tmp/ep1.mp3".to_string()));
        assert_eq!(reloaded.processed_path("ep1").await, None);
    }

    #[tokio::test]
    async fn missing_state_files_start_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = ResumeState::load(dir.path()).await.unwrap();
        assert_eq!(state.downloaded_path("missing").await, None);
    }
}
