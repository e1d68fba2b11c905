//! Feed document parsing.

use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::{debug, warn};

use crate::feed::types::{FeedItem, ParsedFeed};
use crate::{Result, VidsatError};

/// Parse feed bytes into an ordered list of items.
///
/// Entries without a permalink or without an encoded content body are
/// skipped. When the document does not parse as-is, one more attempt is made
/// after [`cleanup_xml`].
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = match parser::parse(bytes) {
        Ok(feed) => feed,
        Err(first_err) => {
            let text = String::from_utf8_lossy(bytes);
            if !(text.contains("<rss") || text.contains("<feed")) {
                return Err(VidsatError::Parse(format!(
                    "document is not an RSS feed: {first_err}"
                )));
            }
            let cleaned = cleanup_xml(&text);
            let feed = parser::parse(cleaned.as_bytes()).map_err(|second_err| {
                VidsatError::Parse(format!(
                    "failed to parse feed even after cleanup. First error: {first_err}. Second error: {second_err}"
                ))
            })?;
            warn!("Feed parsed only after XML cleanup");
            feed
        }
    };

    let title = feed.title.map(|t| t.content);
    let mut items = Vec::with_capacity(feed.entries.len());
    let mut skipped = 0;

    for entry in feed.entries {
        match item_from_entry(entry) {
            Some(item) => items.push(item),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} feed entries without link or content", skipped);
    }

    Ok(ParsedFeed {
        title,
        items,
        skipped,
    })
}

fn item_from_entry(entry: Entry) -> Option<FeedItem> {
    let Some(link) = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
    else {
        debug!("Skipping entry {}: no link", entry.id);
        return None;
    };

    let Some(content) = entry
        .content
        .and_then(|c| c.body)
        .filter(|body| !body.trim().is_empty())
    else {
        debug!("Skipping entry {}: no encoded content", link);
        return None;
    };

    Some(FeedItem {
        link,
        content,
        description: entry.summary.map(|t| t.content),
        published_at: entry.published.or(entry.updated),
    })
}

/// Clean up malformed XML.
///
/// Strips a byte order mark and anything before the XML declaration or root
/// element, rewrites common HTML entities into numeric references and drops
/// characters that are invalid in XML.
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    if let Some(start) = ["<?xml", "<rss", "<feed"]
        .iter()
        .find_map(|marker| cleaned.find(marker))
    {
        cleaned = cleaned[start..].to_string();
    }

    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&hellip;", "&#8230;");

    cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect()
}
