//! Embedded video detection.
//!
//! Pattern matching over raw HTML fragments. This is not an HTML parser:
//! malformed or partial markup is fine, and finding nothing is a normal
//! outcome rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;

static YOUTUBE_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"youtube\.com").expect("valid youtube host regex"));

static VIMEO_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com").expect("valid vimeo host regex"));

/// YouTube shapes in priority order: `/v/<id>`, `watch?v=<id>`, `/embed/<id>`.
///
/// Encoded embed markup often doubles the slash after the host, so one or
/// two slashes are accepted.
static YOUTUBE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r#"youtube\.com/{1,2}v/([^&#?"'\\<>\s/]+)"#).expect("valid youtube /v/ regex"),
        Regex::new(r#"youtube\.com/{1,2}watch\?v=([^&#?"'\\<>\s]+)"#)
            .expect("valid youtube watch regex"),
        Regex::new(r#"youtube\.com/{1,2}embed/([^&#?"'\\<>\s/]+)"#)
            .expect("valid youtube embed regex"),
    ]
});

/// Vimeo shapes in priority order: player URL, then plain numeric page.
static VIMEO_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"player\.vimeo\.com/video/(\d+)").expect("valid vimeo player regex"),
        Regex::new(r"vimeo\.com/(\d+)").expect("valid vimeo page regex"),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    YouTube,
    Vimeo,
}

impl Host {
    fn detect(content: &str) -> Option<Self> {
        if YOUTUBE_HOST.is_match(content) {
            Some(Host::YouTube)
        } else if VIMEO_HOST.is_match(content) {
            Some(Host::Vimeo)
        } else {
            None
        }
    }

    fn patterns(self) -> &'static [Regex] {
        match self {
            Host::YouTube => YOUTUBE_PATTERNS.as_slice(),
            Host::Vimeo => VIMEO_PATTERNS.as_slice(),
        }
    }

    fn video_url(self, id: &str) -> String {
        match self {
            Host::YouTube => format!("http://www.youtube.com/watch?v={id}"),
            Host::Vimeo => format!("http://vimeo.com/{id}"),
        }
    }
}

/// Identify the single highest-priority video in `content`.
///
/// YouTube takes precedence over Vimeo: when the fragment mentions YouTube at
/// all, Vimeo is not considered. Within a host the first pattern that matches
/// wins.
pub fn identify_embed(content: &str) -> Option<String> {
    let host = Host::detect(content)?;
    host.patterns()
        .iter()
        .find_map(|pattern| pattern.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|id| host.video_url(id.as_str()))
}

/// Extract every distinct video in `content`, in order of appearance.
///
/// The same host precedence as [`identify_embed`] applies.
pub fn extract_embeds(content: &str) -> Vec<String> {
    let Some(host) = Host::detect(content) else {
        return Vec::new();
    };

    let mut found: Vec<(usize, String)> = host
        .patterns()
        .iter()
        .flat_map(|pattern| pattern.captures_iter(content))
        .filter_map(|caps| caps.get(1))
        .map(|id| (id.start(), host.video_url(id.as_str())))
        .collect();
    found.sort_by_key(|(offset, _)| *offset);

    let mut urls: Vec<String> = Vec::with_capacity(found.len());
    for (_, url) in found {
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}
