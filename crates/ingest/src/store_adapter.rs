//! HTTP-backed [`ObjectStorePort`] adapter. The vendor SDK wiring itself is
//! out of scope (spec.md §1); this talks to any S3-compatible PUT endpoint
//! over plain HTTP, splitting large payloads into concurrent ranged parts
//! the way a multipart upload would (spec.md §4.1).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bilingo_core::{ObjectStoreError, ObjectStorePort};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::objectstore::{self, MULTIPART_MAX_PARALLEL, MULTIPART_PART_BYTES, MULTIPART_THRESHOLD_BYTES};

/// Configuration for [`HttpObjectStore`], read from `Settings` at
/// composition time (spec.md §6: object-store credentials, CDN base/auth key).
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub put_base_url: String,
    pub cdn_base_url: String,
    pub cdn_auth_key: String,
}

pub struct HttpObjectStore {
    client: reqwest::Client,
    config: ObjectStoreConfig,
}

impl HttpObjectStore {
    #[must_use]
    pub fn new(config: ObjectStoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }

    async fn put_whole(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), ObjectStoreError> {
        let url = format!("{}/{}", self.config.put_base_url.trim_end_matches('/'), key);
        let response = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ObjectStoreError::Transient(e.to_string()))?;
        if response.status().is_server_error() {
            return Err(ObjectStoreError::Transient(format!("server error {}", response.status())));
        }
        if !response.status().is_success() {
            return Err(ObjectStoreError::Internal(format!("unexpected status {}", response.status())));
        }
        Ok(())
    }

    async fn put_multipart(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ObjectStoreError> {
        let total = bytes.len() as u64;
        let bytes = Arc::new(bytes);
        let semaphore = Arc::new(Semaphore::new(MULTIPART_MAX_PARALLEL));
        let part_count = total.div_ceil(MULTIPART_PART_BYTES);
        info!(key, total, part_count, "uploading audio via multipart");

        let mut tasks = JoinSet::new();
        for part_index in 0..part_count {
            let start = part_index * MULTIPART_PART_BYTES;
            let end = ((part_index + 1) * MULTIPART_PART_BYTES).min(total);
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let bytes = Arc::clone(&bytes);
            let url = format!("{}/{}", self.config.put_base_url.trim_end_matches('/'), key);
            let content_type = content_type.to_string();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let chunk = bytes[start as usize..end as usize].to_vec();
                client
                    .put(&url)
                    .header("Content-Type", content_type)
                    .header("Content-Range", format!("bytes {start}-{}/{total}", end - 1))
                    .body(chunk)
                    .send()
                    .await
                    .map_err(|e| ObjectStoreError::Transient(e.to_string()))
                    .and_then(|response| {
                        if response.status().is_success() {
                            Ok(())
                        } else if response.status().is_server_error() {
                            Err(ObjectStoreError::Transient(format!("server error {}", response.status())))
                        } else {
                            Err(ObjectStoreError::Internal(format!("unexpected status {}", response.status())))
                        }
                    })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined.expect("upload part task panicked") {
                tasks.abort_all();
                warn!(key, %err, "multipart upload part failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorePort for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ObjectStoreError> {
        if bytes.len() as u64 > MULTIPART_THRESHOLD_BYTES {
            self.put_multipart(key, bytes, content_type).await
        } else {
            self.put_whole(key, &bytes, content_type).await
        }
    }

    fn sign_url(&self, key: &str, expires_seconds: u32) -> String {
        let now = chrono::Utc::now().timestamp();
        objectstore::sign_url(&self.config.cdn_base_url, key, expires_seconds, &self.config.cdn_auth_key, now)
    }
}
