//! Configuration module for vidsat.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::{Result, VidsatError};

/// Environment variable overriding the sharing server.
pub const SERVER_ENV: &str = "VIDSAT_SERVER";

/// Environment variables that request clearing every watermark before a run.
pub const CLOBBER_ENV_VARS: [&str; 2] = ["CLOBBER", "FORCE"];

/// How many videos a single feed item may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideosPerItem {
    /// At most one video per item (the highest-priority embed).
    #[default]
    Single,
    /// One video per distinct embed found in the item.
    All,
}

/// Remote sharing API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SharingConfig {
    /// Host (or full base URL) of the sharing server.
    #[serde(default)]
    pub server: String,
    /// Application identifier sent with every share.
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

fn default_app_id() -> String {
    "vhx_channels".to_string()
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            app_id: default_app_id(),
        }
    }
}

impl SharingConfig {
    /// Base URL of the sharing server, defaulting the scheme to `http`.
    pub fn base_url(&self) -> String {
        with_default_scheme(self.server.trim()).trim_end_matches('/').to_string()
    }
}

/// Pipeline behaviour shared by all feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Delay between two consecutive shares, in milliseconds.
    #[serde(default = "default_share_delay")]
    pub share_delay_ms: u64,
    /// Default single-vs-multi video policy.
    #[serde(default)]
    pub videos_per_item: VideosPerItem,
}

fn default_share_delay() -> u64 {
    1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            share_delay_ms: default_share_delay(),
            videos_per_item: VideosPerItem::default(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Extra attempts after a failed feed fetch.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    /// Delay before retrying a failed feed fetch, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_user_agent() -> String {
    format!("vidsat/{} (video satellite)", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_fetch_retries() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            fetch_retries: default_fetch_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// Watermark persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkBackend {
    /// One small file per feed.
    #[default]
    File,
    /// A `watermarks` table in a SQLite database.
    Sqlite,
}

/// Watermark storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatermarkConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: WatermarkBackend,
    /// Directory holding watermark files (file backend).
    #[serde(default = "default_watermark_dir")]
    pub dir: String,
    /// Path to the SQLite database (sqlite backend).
    #[serde(default = "default_watermark_database")]
    pub database: String,
}

fn default_watermark_dir() -> String {
    "data/watermarks".to_string()
}

fn default_watermark_database() -> String {
    "data/vidsat.db".to_string()
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            backend: WatermarkBackend::default(),
            dir: default_watermark_dir(),
            database: default_watermark_database(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// One blog source.
#[derive(Clone, Deserialize)]
pub struct BlogConfig {
    /// Feed URL; `http://` is assumed when no scheme is given.
    #[serde(default)]
    pub url: String,
    /// Login on the sharing server.
    #[serde(default)]
    pub username: String,
    /// API token on the sharing server.
    #[serde(default)]
    pub api_token: String,
    /// Log instead of posting.
    #[serde(default)]
    pub dry_run: bool,
    /// Send the item description as share comment.
    #[serde(default = "default_descriptions")]
    pub descriptions: bool,
    /// Per-feed override of the pipeline's video policy.
    #[serde(default)]
    pub videos_per_item: Option<VideosPerItem>,
}

fn default_descriptions() -> bool {
    true
}

impl BlogConfig {
    /// Create a blog config with the required fields and default flags.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            api_token: api_token.into(),
            dry_run: false,
            descriptions: default_descriptions(),
            videos_per_item: None,
        }
    }

    /// Canonical feed URL, used for fetching and as the watermark identity.
    pub fn feed_url(&self) -> String {
        with_default_scheme(self.url.trim())
    }

    /// Video policy for this feed.
    pub fn videos_per_item(&self, pipeline: &PipelineConfig) -> VideosPerItem {
        self.videos_per_item.unwrap_or(pipeline.videos_per_item)
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.api_token.trim().is_empty() {
            missing.push("api_token");
        }
        missing
    }
}

impl fmt::Debug for BlogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlogConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .field("dry_run", &self.dry_run)
            .field("descriptions", &self.descriptions)
            .field("videos_per_item", &self.videos_per_item)
            .finish()
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Sharing server.
    #[serde(default)]
    pub sharing: SharingConfig,
    /// Pipeline behaviour.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Watermark storage.
    #[serde(default)]
    pub watermark: WatermarkConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Configured blogs, processed in order.
    #[serde(default)]
    pub blogs: Vec<BlogConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VidsatError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file, apply environment overrides and validate.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VidsatError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `VIDSAT_SERVER`: Override the sharing server
    pub fn apply_env_overrides(&mut self) {
        if let Ok(server) = std::env::var(SERVER_ENV) {
            if !server.trim().is_empty() {
                self.sharing.server = server;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the server or the blog list is missing, or if any
    /// blog lacks `url`, `username` or `api_token`.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.sharing.server.trim().is_empty() {
            problems.push("sharing.server is required".to_string());
        }
        if self.blogs.is_empty() {
            problems.push("at least one [[blogs]] entry is required".to_string());
        }

        for (index, blog) in self.blogs.iter().enumerate() {
            let missing = blog.missing_fields();
            if !missing.is_empty() {
                problems.push(format!(
                    "blogs[{index}] is incomplete: missing {} (url, username, api_token are required); config => {blog:?}",
                    missing.join(", ")
                ));
                continue;
            }
            if !is_http_url(&blog.feed_url()) {
                problems.push(format!(
                    "blogs[{index}] url is not a valid http(s) URL: {:?}",
                    blog.url
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(VidsatError::Config(problems.join("; ")))
        }
    }
}

/// Whether the environment requests clearing all watermarks.
pub fn clobber_requested_by_env() -> bool {
    CLOBBER_ENV_VARS
        .iter()
        .any(|var| is_flag_set(std::env::var(var).ok().as_deref()))
}

fn is_flag_set(value: Option<&str>) -> bool {
    value.map(str::trim) == Some("1")
}

fn with_default_scheme(url: &str) -> String {
    if has_scheme(url) {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

fn has_scheme(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn is_http_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[sharing]
server = "vhx.tv"

[[blogs]]
url = "example.com/feed"
username = "alice"
api_token = "secret"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.sharing.server.is_empty());
        assert_eq!(config.sharing.app_id, "vhx_channels");

        assert_eq!(config.pipeline.share_delay_ms, 1000);
        assert_eq!(config.pipeline.videos_per_item, VideosPerItem::Single);

        assert!(config.http.user_agent.starts_with("vidsat/"));
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.total_timeout_secs, 30);
        assert_eq!(config.http.max_redirects, 10);
        assert_eq!(config.http.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.http.fetch_retries, 1);
        assert_eq!(config.http.retry_delay_ms, 1000);

        assert_eq!(config.watermark.backend, WatermarkBackend::File);
        assert_eq!(config.watermark.dir, "data/watermarks");
        assert_eq!(config.watermark.database, "data/vidsat.db");

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());

        assert!(config.blogs.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.sharing.server, "vhx.tv");
        assert_eq!(config.blogs.len(), 1);

        let blog = &config.blogs[0];
        assert_eq!(blog.username, "alice");
        assert!(!blog.dry_run);
        assert!(blog.descriptions);
        assert!(blog.videos_per_item.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[sharing]
server = "https://share.example.org/"
app_id = "custom_app"

[pipeline]
share_delay_ms = 0
videos_per_item = "all"

[http]
user_agent = "test-agent"
fetch_retries = 0

[watermark]
backend = "sqlite"
database = "/tmp/wm.db"

[logging]
level = "debug"
file = "logs/vidsat.log"

[[blogs]]
url = "https://one.example.com/rss"
username = "one"
api_token = "t1"
dry_run = true
descriptions = false
videos_per_item = "single"

[[blogs]]
url = "two.example.com/rss"
username = "two"
api_token = "t2"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.sharing.base_url(), "https://share.example.org");
        assert_eq!(config.sharing.app_id, "custom_app");
        assert_eq!(config.pipeline.share_delay_ms, 0);
        assert_eq!(config.pipeline.videos_per_item, VideosPerItem::All);
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.http.fetch_retries, 0);
        assert_eq!(config.watermark.backend, WatermarkBackend::Sqlite);
        assert_eq!(config.watermark.database, "/tmp/wm.db");
        assert_eq!(config.logging.file.as_deref(), Some("logs/vidsat.log"));

        let one = &config.blogs[0];
        assert!(one.dry_run);
        assert!(!one.descriptions);
        assert_eq!(
            one.videos_per_item(&config.pipeline),
            VideosPerItem::Single
        );
        let two = &config.blogs[1];
        assert_eq!(two.videos_per_item(&config.pipeline), VideosPerItem::All);
        assert_eq!(two.feed_url(), "http://two.example.com/rss");

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = Config::parse("[sharing\nserver = ").unwrap_err();
        assert!(matches!(err, VidsatError::Config(_)));
    }

    #[test]
    fn test_validate_missing_server_and_blogs() {
        let err = Config::default().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sharing.server is required"));
        assert!(msg.contains("[[blogs]]"));
    }

    #[test]
    fn test_validate_incomplete_blog() {
        let toml = r#"
[sharing]
server = "vhx.tv"

[[blogs]]
url = "example.com/feed"
api_token = "secret"
"#;
        let err = Config::parse(toml).unwrap().validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("blogs[0] is incomplete: missing username"));
        assert!(!msg.contains("secret"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.blogs[0].url = "ftp://example.com/feed".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_other_schemes_with_default_scheme_applied() {
        for url in ["ftp://example.com/feed", "file:///tmp/feed.xml", "gopher://example.com"] {
            let mut config = Config::parse(MINIMAL).unwrap();
            config.blogs[0].url = url.to_string();
            assert!(!config.blogs[0].feed_url().starts_with("http://"));
            let msg = config.validate().unwrap_err().to_string();
            assert!(msg.contains("not a valid http(s) URL"), "{url}: {msg}");
        }
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("ftp://example.com/feed"));
        assert!(has_scheme("svn+ssh://example.com"));
        assert!(!has_scheme("example.com/feed"));
        assert!(!has_scheme("example.com/feed?ref=http://other.example.com"));
        assert_eq!(
            BlogConfig::new("example.com/feed?ref=http://x.example.com", "a", "b").feed_url(),
            "http://example.com/feed?ref=http://x.example.com"
        );
    }

    #[test]
    fn test_clobber_requested_by_env() {
        // CLOBBER and FORCE are only touched by this test.
        std::env::remove_var("CLOBBER");
        std::env::remove_var("FORCE");
        assert!(!clobber_requested_by_env());

        std::env::set_var("CLOBBER", "1");
        assert!(clobber_requested_by_env());
        std::env::set_var("CLOBBER", "0");
        assert!(!clobber_requested_by_env());
        std::env::remove_var("CLOBBER");

        std::env::set_var("FORCE", "1");
        assert!(clobber_requested_by_env());
        std::env::set_var("FORCE", "yes");
        assert!(!clobber_requested_by_env());
        std::env::remove_var("FORCE");
    }

    #[test]
    fn test_feed_url_keeps_existing_scheme() {
        let blog = BlogConfig::new("https://example.com/feed", "a", "b");
        assert_eq!(blog.feed_url(), "https://example.com/feed");
        let blog = BlogConfig::new("  example.com/feed ", "a", "b");
        assert_eq!(blog.feed_url(), "http://example.com/feed");
    }

    #[test]
    fn test_sharing_base_url_defaults_scheme() {
        let sharing = SharingConfig {
            server: "vhx.tv".to_string(),
            ..Default::default()
        };
        assert_eq!(sharing.base_url(), "http://vhx.tv");
    }

    #[test]
    fn test_blog_debug_redacts_token() {
        let blog = BlogConfig::new("example.com", "alice", "super-secret");
        let debug = format!("{blog:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_is_flag_set() {
        assert!(is_flag_set(Some("1")));
        assert!(is_flag_set(Some(" 1 ")));
        assert!(!is_flag_set(Some("0")));
        assert!(!is_flag_set(Some("true")));
        assert!(!is_flag_set(None));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = Config::load("/nonexistent/vidsat.toml").unwrap_err();
        assert!(matches!(err, VidsatError::Config(_)));
    }
}
