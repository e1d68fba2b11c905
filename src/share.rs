//! Posting videos to the sharing server.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BlogConfig, SharingConfig};
use crate::video::Video;
use crate::VidsatError;

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

/// Outcome of a failed share.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The server refused the credentials. Fatal for the whole batch.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The server answered with any other non-success status.
    #[error("rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ShareError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ShareError::Unauthorized { .. })
    }

    /// Convert into the crate error, attaching the login and video.
    pub fn into_error(self, video: &Video, login: &str) -> VidsatError {
        match self {
            ShareError::Unauthorized { status } => VidsatError::Auth {
                login: login.to_string(),
                status,
            },
            other => VidsatError::Share {
                url: video.url.clone(),
                reason: other.to_string(),
            },
        }
    }
}

/// Something videos can be shared to.
#[async_trait]
pub trait Sharer: Send + Sync {
    /// Share one video on behalf of the blog's login.
    async fn share(&self, video: &Video, blog: &BlogConfig) -> Result<(), ShareError>;
}

/// Sharer posting to `/videos/share.xml` on the configured server.
#[derive(Debug, Clone)]
pub struct HttpSharer {
    client: Client,
    endpoint: String,
    app_id: String,
}

impl HttpSharer {
    pub fn new(client: Client, config: &SharingConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/videos/share.xml", config.base_url()),
            app_id: config.app_id.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Sharer for HttpSharer {
    async fn share(&self, video: &Video, blog: &BlogConfig) -> Result<(), ShareError> {
        info!(
            "{}: sharing {} shared_at={} found_on_url={} comment={:?}",
            blog.username, video.url, video.shared_at, video.found_on_url, video.share_comment
        );

        if blog.dry_run {
            info!("DRY RUN, not posting {}", video.url);
            return Ok(());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("login", blog.username.as_str()),
                ("api_token", blog.api_token.as_str()),
            ])
            .form(&video.form_fields())
            .send()
            .await
            .map_err(|e| ShareError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ShareError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!("Share of {} rejected with {}", video.url, status);
            return Err(ShareError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Shared {} ({})", video.url, status);
        Ok(())
    }
}
