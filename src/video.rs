//! The shareable video record.

use chrono::{DateTime, Utc};

/// A video found on a blog post, ready to be shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Video {
    /// Absolute URL of the video on a known host.
    pub url: String,
    /// Canonical URL of the post the video was found on.
    ///
    /// Deduplication and the watermark key on this value.
    pub found_on_url: String,
    /// Comment attached to the share, usually the post description.
    pub share_comment: Option<String>,
    /// Time the share is attributed to.
    pub shared_at: DateTime<Utc>,
    /// Permalink as it appeared in the feed, before canonicalization.
    pub original_url: String,
}

impl Video {
    /// Form fields sent to the sharing endpoint.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("url", self.url.clone()),
            ("original_url", self.original_url.clone()),
            ("found_on_url", self.found_on_url.clone()),
            ("shared_at", self.shared_at.to_rfc3339()),
        ];
        if let Some(comment) = &self.share_comment {
            fields.push(("share_comment", comment.clone()));
        }
        fields
    }
}
