//! Object-Store Client port (L2). Implemented by the `ingest` crate.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Uploads audio/segment JSON under content-addressed keys and signs
/// short-lived download URLs (spec.md §4.4, §6).
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// Uploads `bytes` under `key`, using multipart upload when `bytes.len()`
    /// exceeds the configured threshold (spec.md §4.1: >20 MiB, 10 MiB
    /// parts, max 5 parallel parts).
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ObjectStoreError>;

    /// Produces a CDN Type-A signed URL for `key`, valid for
    /// `expires_seconds` from now (spec.md §4.4).
    fn sign_url(&self, key: &str, expires_seconds: u32) -> String;
}
