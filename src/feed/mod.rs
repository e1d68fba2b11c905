//! Feed module for vidsat.
//!
//! Fetching raw feed documents and turning them into ordered feed items.

pub mod fetcher;
pub mod parser;
pub mod types;

pub use fetcher::{FeedFetcher, HttpFeedFetcher};
pub use parser::parse_feed;
pub use types::{FeedItem, ParsedFeed};
