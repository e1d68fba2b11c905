//! Feed types for vidsat.

use chrono::{DateTime, Utc};

/// One entry parsed from a blog feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Original permalink of the post.
    pub link: String,
    /// Full HTML body (the encoded content, not the summary).
    pub content: String,
    /// Short description.
    pub description: Option<String>,
    /// When the post was published.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Create a new item without description or publish date.
    pub fn new(link: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            content: content.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the publish date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// A parsed feed document.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Feed title, if any.
    pub title: Option<String>,
    /// Usable items, in document order.
    pub items: Vec<FeedItem>,
    /// Number of entries dropped for missing a permalink or content body.
    pub skipped: usize,
}
