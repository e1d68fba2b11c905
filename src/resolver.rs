//! Turning feed items into shareable videos.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use crate::canonical::canonicalize;
use crate::config::{BlogConfig, VideosPerItem};
use crate::embed::{extract_embeds, identify_embed};
use crate::feed::FeedItem;
use crate::video::Video;
use crate::{Result, VidsatError};

/// Resolves a permalink to the URL it finally lands on.
#[async_trait]
pub trait LinkExpander: Send + Sync {
    /// Follow redirects for `url` and return the final location.
    async fn expand(&self, url: &str) -> Result<String>;
}

/// Link expander issuing a header-only request.
#[derive(Debug, Clone)]
pub struct HttpLinkExpander {
    client: Client,
}

impl HttpLinkExpander {
    /// Create an expander on top of the shared client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LinkExpander for HttpLinkExpander {
    async fn expand(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| VidsatError::fetch(url, e))?;

        let status = response.status();
        if status.is_server_error() || status.is_client_error() {
            return Err(VidsatError::fetch(url, format!("HTTP error: {status}")));
        }

        Ok(response.url().to_string())
    }
}

/// Builds [`Video`] records from feed items.
#[derive(Clone)]
pub struct VideoResolver {
    expander: Arc<dyn LinkExpander>,
}

impl VideoResolver {
    /// Create a resolver using the given link expander.
    pub fn new(expander: Arc<dyn LinkExpander>) -> Self {
        Self { expander }
    }

    /// Resolve one item into zero or more videos.
    ///
    /// Items without a recognizable embed, and items whose permalink cannot
    /// be expanded, yield nothing.
    pub async fn resolve(
        &self,
        item: &FeedItem,
        blog: &BlogConfig,
        policy: VideosPerItem,
    ) -> Vec<Video> {
        let embeds = match policy {
            VideosPerItem::Single => identify_embed(&item.content).into_iter().collect(),
            VideosPerItem::All => extract_embeds(&item.content),
        };
        if embeds.is_empty() {
            debug!("No video found for {}", item.link);
            return Vec::new();
        }

        let expanded = match self.expander.expand(&item.link).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping {:?}, permalink could not be resolved: {}", item.link, e);
                return Vec::new();
            }
        };
        let found_on_url = canonicalize(&expanded);
        if found_on_url.is_empty() {
            warn!("Skipping {:?}, permalink resolved to nothing", item.link);
            return Vec::new();
        }

        let share_comment = if blog.descriptions {
            item.description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
        } else {
            None
        };
        let shared_at = item.published_at.unwrap_or_else(Utc::now);

        embeds
            .into_iter()
            .map(|url| {
                debug!("{:?}: found video {:?} shared_at={}", found_on_url, url, shared_at);
                Video {
                    url,
                    found_on_url: found_on_url.clone(),
                    share_comment: share_comment.clone(),
                    shared_at,
                    original_url: item.link.clone(),
                }
            })
            .collect()
    }
}
