//! vidsat - video satellite
//!
//! Watches blog feeds for embedded YouTube and Vimeo videos and shares every
//! new one to a video sharing server, oldest first, remembering per feed how
//! far it got.

pub mod canonical;
pub mod config;
pub mod embed;
pub mod error;
pub mod feed;
pub mod http;
pub mod logging;
pub mod pipeline;
pub mod resolver;
pub mod runner;
pub mod share;
pub mod video;
pub mod watermark;

pub use canonical::canonicalize;
pub use config::{BlogConfig, Config};
pub use embed::{extract_embeds, identify_embed};
pub use error::{Result, VidsatError};
pub use feed::{FeedFetcher, FeedItem, HttpFeedFetcher};
pub use pipeline::{order_for_sharing, select_new, FeedRunOutcome, IngestionPipeline};
pub use resolver::{HttpLinkExpander, LinkExpander, VideoResolver};
pub use runner::{run, run_feeds, RunSummary};
pub use share::{HttpSharer, ShareError, Sharer};
pub use video::Video;
pub use watermark::{watermark_key, WatermarkStore};
