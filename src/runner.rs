//! Batch run over every configured feed.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{BlogConfig, Config};
use crate::feed::HttpFeedFetcher;
use crate::http::build_client;
use crate::pipeline::{FeedRunOutcome, IngestionPipeline};
use crate::resolver::{HttpLinkExpander, VideoResolver};
use crate::share::HttpSharer;
use crate::watermark::{open_store, watermark_key, WatermarkStore};
use crate::Result;

/// Totals of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Feeds whose pipeline ran to the end.
    pub feeds_processed: usize,
    /// Feeds that could not be fetched or parsed.
    pub feeds_without_data: usize,
    /// Feeds that failed on a non-fatal error such as watermark storage.
    pub feeds_failed: usize,
    /// Videos shared (or logged in dry-run).
    pub shared: usize,
    /// Videos whose share failed for a non-auth reason.
    pub share_failures: usize,
    /// Set when the batch was aborted by an authentication failure.
    pub aborted: Option<String>,
}

impl RunSummary {
    /// Process exit status for this run.
    pub fn exit_code(&self) -> i32 {
        if self.aborted.is_some() {
            1
        } else {
            0
        }
    }

    fn record(&mut self, outcome: FeedRunOutcome) {
        self.feeds_processed += 1;
        match outcome {
            FeedRunOutcome::NoData => self.feeds_without_data += 1,
            FeedRunOutcome::NothingNew => {}
            FeedRunOutcome::Completed { shared, failed } => {
                self.shared += shared;
                self.share_failures += failed;
            }
        }
    }
}

/// Run every configured feed once with HTTP collaborators built from `config`.
///
/// When `clobber` is set every feed's watermark is cleared first, so the
/// whole feed window is shared again.
pub async fn run(config: &Config, clobber: bool) -> Result<RunSummary> {
    let client = build_client(&config.http)?;
    let store = open_store(&config.watermark).await?;

    let pipeline = IngestionPipeline::new(
        Arc::new(HttpFeedFetcher::new(client.clone(), &config.http)),
        VideoResolver::new(Arc::new(HttpLinkExpander::new(client.clone()))),
        store.clone(),
        Arc::new(HttpSharer::new(client, &config.sharing)),
        config.pipeline.clone(),
    );

    run_feeds(&pipeline, store.as_ref(), &config.blogs, clobber).await
}

/// Run `blogs` in order through `pipeline`.
///
/// Stops at the first authentication failure; any other per-feed error is
/// logged and the next feed runs.
pub async fn run_feeds(
    pipeline: &IngestionPipeline,
    store: &dyn WatermarkStore,
    blogs: &[BlogConfig],
    clobber: bool,
) -> Result<RunSummary> {
    if clobber {
        clear_watermarks(store, blogs).await?;
    }

    let mut summary = RunSummary::default();
    for blog in blogs {
        match pipeline.run_feed(blog).await {
            Ok(outcome) => summary.record(outcome),
            Err(e) if e.is_fatal() => {
                error!("Aborting run: {}", e);
                summary.aborted = Some(e.to_string());
                break;
            }
            Err(e) => {
                error!("Feed {:?} failed: {}", blog.feed_url(), e);
                summary.feeds_failed += 1;
            }
        }
    }

    info!(
        "Done: {} feed(s), {} shared, {} failed share(s), {} feed(s) without data",
        summary.feeds_processed,
        summary.shared,
        summary.share_failures,
        summary.feeds_without_data
    );
    Ok(summary)
}

async fn clear_watermarks(store: &dyn WatermarkStore, blogs: &[BlogConfig]) -> Result<()> {
    for blog in blogs {
        let feed_url = blog.feed_url();
        warn!("Clobbering watermark for {}", feed_url);
        store.clear(&watermark_key(&feed_url)).await?;
    }
    Ok(())
}
