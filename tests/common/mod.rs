//! Test helpers for end-to-end runs.
//!
//! Provides a mock blog/sharing server, feed builders and a config builder.

#![allow(dead_code)]

use std::path::Path;

use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidsat::watermark::FileWatermarkStore;
use vidsat::{watermark_key, Config, WatermarkStore};

/// Path of the sharing endpoint.
pub const SHARE_PATH: &str = "/videos/share.xml";

/// One blog post in a generated feed.
pub struct Post {
    pub slug: &'static str,
    pub hour: u32,
    pub vimeo_id: u32,
    pub description: Option<&'static str>,
}

impl Post {
    pub fn new(slug: &'static str, hour: u32, vimeo_id: u32) -> Self {
        Self {
            slug,
            hour,
            vimeo_id,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Build an RSS document for `posts`, newest first as given.
///
/// Permalinks point at `{base}/posts/{slug}` with a tracking query string.
pub fn rss(base: &str, posts: &[Post]) -> String {
    let mut items = String::new();
    for post in posts {
        let description = post
            .description
            .map(|d| format!("<description>{d}</description>"))
            .unwrap_or_default();
        items.push_str(&format!(
            r#"
    <item>
      <title>{slug}</title>
      <link>{base}/posts/{slug}?utm_source=rss</link>
      <pubDate>Tue, 10 Jan 2012 {hour:02}:00:00 +0000</pubDate>
      {description}
      <content:encoded><![CDATA[<p>Watch</p><iframe src="http://player.vimeo.com/video/{id}"></iframe>]]></content:encoded>
    </item>"#,
            slug = post.slug,
            hour = post.hour,
            id = post.vimeo_id,
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Test Blog</title>
    <link>{base}</link>
    <description>Posts with videos</description>{items}
  </channel>
</rss>"#
    )
}

/// Serve `body` as the feed at `feed_path`.
pub async fn mount_feed(server: &MockServer, feed_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(feed_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Answer permalink expansion for every `/posts/...` page.
pub async fn mount_permalinks(server: &MockServer) {
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/posts/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Accept every share.
pub async fn mount_share_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(SHARE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<video/>"))
        .mount(server)
        .await;
}

/// One configured blog for [`config`].
pub struct TestBlog<'a> {
    pub feed_path: &'a str,
    pub username: &'a str,
    pub dry_run: bool,
}

impl<'a> TestBlog<'a> {
    pub fn new(feed_path: &'a str, username: &'a str) -> Self {
        Self {
            feed_path,
            username,
            dry_run: false,
        }
    }
}

/// Build a config pointing everything at `server`, with watermarks in `dir`.
pub fn config(server: &MockServer, dir: &Path, blogs: &[TestBlog<'_>]) -> Config {
    let mut toml = format!(
        r#"
[sharing]
server = "{uri}"

[pipeline]
share_delay_ms = 0

[http]
fetch_retries = 0
retry_delay_ms = 0

[watermark]
backend = "file"
dir = '{dir}'
"#,
        uri = server.uri(),
        dir = dir.display(),
    );
    for blog in blogs {
        toml.push_str(&format!(
            r#"
[[blogs]]
url = "{uri}{feed_path}"
username = "{username}"
api_token = "token-{username}"
dry_run = {dry_run}
"#,
            uri = server.uri(),
            feed_path = blog.feed_path,
            username = blog.username,
            dry_run = blog.dry_run,
        ));
    }

    let config = Config::parse(&toml).expect("test config should parse");
    config.validate().expect("test config should be valid");
    config
}

/// Read the stored watermark for the feed at `feed_path`.
pub async fn watermark(server: &MockServer, dir: &Path, feed_path: &str) -> Option<String> {
    let store = FileWatermarkStore::new(dir);
    let key = watermark_key(&format!("{}{}", server.uri(), feed_path));
    store.get(&key).await.expect("watermark should be readable")
}

/// Form fields of every share request received, in arrival order.
pub async fn shared_forms(server: &MockServer) -> Vec<Vec<(String, String)>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == SHARE_PATH)
        .map(|r| {
            url::form_urlencoded::parse(&r.body)
                .into_owned()
                .collect::<Vec<_>>()
        })
        .collect()
}

/// The `url` field of every share request, in arrival order.
pub async fn shared_video_urls(server: &MockServer) -> Vec<String> {
    shared_forms(server)
        .await
        .into_iter()
        .filter_map(|fields| {
            fields
                .into_iter()
                .find(|(name, _)| name == "url")
                .map(|(_, value)| value)
        })
        .collect()
}
