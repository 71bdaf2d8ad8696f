//! A `FeedClientPort` adapter over a configured aggregator endpoint
//! returning already-normalized episode records. Feed/RSS scraping itself
//! is out of scope (spec.md §1) — this adapter assumes some upstream
//! service (or a static export of `podcast_fetcher_service.py` and its
//! source-specific siblings) already produced the normalized JSON this
//! reads.

use std::time::Duration;

use async_trait::async_trait;
use bilingo_core::Episode;

use crate::feed::{FeedClientPort, FeedError};

#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub endpoint: String,
}

pub struct HttpFeedClient {
    client: reqwest::Client,
    config: FeedClientConfig,
}

impl HttpFeedClient {
    #[must_use]
    pub fn new(config: FeedClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");
        Self { client, config }
    }
}

#[async_trait]
impl FeedClientPort for HttpFeedClient {
    async fn fetch_candidates(&self, channel_filter: Option<&str>) -> Result<Vec<Episode>, FeedError> {
        let mut request = self.client.get(&self.config.endpoint);
        if let Some(channel) = channel_filter {
            request = request.query(&[("channel", channel)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FeedError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::Transient(format!("feed aggregator returned {}", response.status())));
        }

        response
            .json::<Vec<Episode>>()
            .await
            .map_err(|e| FeedError::Internal(e.to_string()))
    }
}
