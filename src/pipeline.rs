//! Per-feed ingestion pipeline.
//!
//! One run of a feed goes fetch, parse, resolve, filter against the
//! watermark, order oldest first, then share one video at a time. The
//! watermark is advanced as soon as every video of a page has been handled,
//! so that a crashed run resumes without re-posting or skipping.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::config::{BlogConfig, PipelineConfig};
use crate::feed::{parse_feed, FeedFetcher, FeedItem};
use crate::resolver::VideoResolver;
use crate::share::Sharer;
use crate::video::Video;
use crate::watermark::{watermark_key, WatermarkStore};
use crate::Result;

/// How a single feed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRunOutcome {
    /// The feed could not be fetched or parsed.
    NoData,
    /// Everything in the feed was already shared.
    NothingNew,
    /// At least one share was attempted.
    Completed { shared: usize, failed: usize },
}

/// Give every undated item a publish time for this run.
///
/// The first item gets `run_started` and each following one a second less,
/// so undated items keep their feed order (newest first) when sorted by time.
pub fn date_undated_items(items: Vec<FeedItem>, run_started: DateTime<Utc>) -> Vec<FeedItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, mut item)| {
            if item.published_at.is_none() {
                item.published_at =
                    Some(run_started - chrono::Duration::seconds(index as i64));
            }
            item
        })
        .collect()
}

/// Keep only the candidates newer than the watermark.
///
/// Candidates are put in reverse-chronological order by `shared_at`; ties
/// keep feed order. Everything from the first candidate found on the
/// watermark page onwards has already been shared. A missing watermark, or
/// one that has scrolled out of the feed, keeps the whole list.
pub fn select_new(mut candidates: Vec<Video>, watermark: Option<&str>) -> Vec<Video> {
    candidates.sort_by(|a, b| b.shared_at.cmp(&a.shared_at));
    if let Some(mark) = watermark {
        if let Some(index) = candidates.iter().position(|v| v.found_on_url == mark) {
            candidates.truncate(index);
        }
    }
    candidates
}

/// Order candidates for sharing: ascending `shared_at`.
///
/// Ties keep the oldest feed item first; videos of the same item keep their
/// order of appearance.
pub fn order_for_sharing(candidates: Vec<Video>) -> Vec<Video> {
    let mut groups: Vec<Vec<Video>> = Vec::new();
    for video in candidates {
        match groups.last_mut() {
            Some(group) if group[0].found_on_url == video.found_on_url => group.push(video),
            _ => groups.push(vec![video]),
        }
    }
    groups.reverse();

    let mut ordered: Vec<Video> = groups.into_iter().flatten().collect();
    ordered.sort_by_key(|v| v.shared_at);
    ordered
}

/// Fetches, filters and shares the videos of one feed at a time.
pub struct IngestionPipeline {
    fetcher: Arc<dyn FeedFetcher>,
    resolver: VideoResolver,
    store: Arc<dyn WatermarkStore>,
    sharer: Arc<dyn Sharer>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        resolver: VideoResolver,
        store: Arc<dyn WatermarkStore>,
        sharer: Arc<dyn Sharer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            store,
            sharer,
            config,
        }
    }

    /// Run the pipeline for one feed.
    ///
    /// Fetch and parse failures end the run with [`FeedRunOutcome::NoData`].
    /// An authentication failure is returned as an error and must stop the
    /// whole batch; other share failures are logged and counted.
    pub async fn run_feed(&self, blog: &BlogConfig) -> Result<FeedRunOutcome> {
        let feed_url = blog.feed_url();
        let key = watermark_key(&feed_url);
        info!("{}: fetching {}", blog.username, feed_url);

        let bytes = match self.fetcher.fetch(&feed_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Error fetching feed {:?}: {}", feed_url, e);
                return Ok(FeedRunOutcome::NoData);
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!("Feed {:?} returned an empty document", feed_url);
            return Ok(FeedRunOutcome::NoData);
        }

        let parsed = match parse_feed(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("Error parsing feed {:?}: {}", feed_url, e);
                return Ok(FeedRunOutcome::NoData);
            }
        };
        debug!(
            "Feed {:?} ({}): {} item(s)",
            feed_url,
            parsed.title.as_deref().unwrap_or("untitled"),
            parsed.items.len()
        );

        let policy = blog.videos_per_item(&self.config);
        let items = date_undated_items(parsed.items, Utc::now());
        let mut candidates = Vec::new();
        for item in &items {
            candidates.extend(self.resolver.resolve(item, blog, policy).await);
        }

        let watermark = self.store.get(&key).await?;
        debug!("{}: watermark {:?}", feed_url, watermark);
        let selected = select_new(candidates, watermark.as_deref());
        if selected.is_empty() {
            info!("{}: nothing new to share", feed_url);
            return Ok(FeedRunOutcome::NothingNew);
        }

        let queue = order_for_sharing(selected);
        info!("{}: {} video(s) to share", feed_url, queue.len());

        let delay = Duration::from_millis(self.config.share_delay_ms);
        let mut shared = 0;
        let mut failed = 0;
        let mut page_shared = false;

        for (index, video) in queue.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                sleep(delay).await;
            }

            match self.sharer.share(video, blog).await {
                Ok(()) => {
                    shared += 1;
                    page_shared = true;
                }
                Err(e) if e.is_unauthorized() => {
                    error!(
                        "Sharing as {:?} was rejected: {}; aborting",
                        blog.username, e
                    );
                    return Err(e.into_error(video, &blog.username));
                }
                Err(e) => {
                    error!(
                        "Failed to share {} found on {}: {}",
                        video.url, video.found_on_url, e
                    );
                    failed += 1;
                }
            }

            let page_done = queue
                .get(index + 1)
                .map_or(true, |next| next.found_on_url != video.found_on_url);
            if page_done {
                if page_shared {
                    self.store.set(&key, &video.found_on_url).await?;
                }
                page_shared = false;
            }
        }

        info!(
            "{}: shared {} video(s), {} failed",
            feed_url, shared, failed
        );
        Ok(FeedRunOutcome::Completed { shared, failed })
    }
}
