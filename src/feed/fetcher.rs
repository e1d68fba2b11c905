//! Feed fetching over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::{Result, VidsatError};

/// Source of raw feed documents.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the raw bytes of the feed at `url`.
    ///
    /// Any failure is transient from the pipeline's point of view: the feed
    /// simply has nothing to offer this cycle.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Feed fetcher backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    max_feed_size: u64,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFeedFetcher {
    /// Create a fetcher using the limits from the HTTP configuration.
    pub fn new(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            retries: config.fetch_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VidsatError::fetch(url, e))?;

        if !response.status().is_success() {
            return Err(VidsatError::fetch(
                url,
                format!("HTTP error: {}", response.status()),
            ));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(VidsatError::fetch(
                    url,
                    format!(
                        "feed too large: {} bytes (max {} bytes)",
                        content_length, self.max_feed_size
                    ),
                ));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VidsatError::fetch(url, format!("failed to read response: {e}")))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(VidsatError::fetch(
                url,
                format!(
                    "feed too large: {} bytes (max {} bytes)",
                    bytes.len(),
                    self.max_feed_size
                ),
            ));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = self.retries + 1;
        let mut attempt = 1;

        loop {
            debug!("Fetching feed {} (attempt {}/{})", url, attempt, attempts);
            match self.fetch_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < attempts => {
                    warn!("Error fetching feed {:?}: {}; retrying", url, e);
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
