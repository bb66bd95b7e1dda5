use crate::gallery::GalleryLimits;
use crate::pager::RetryPolicy;
use crate::platform::Platform;
use crate::store::CorruptStatePolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure for Driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub platforms: HashMap<Platform, PlatformConfig>,
}

impl Config {
    /// User-agent header sent on every feed and media request
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.user_agent.crawler_name, self.user_agent.crawler_version, self.user_agent.contact_url
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.crawl.retry_attempts,
            initial_backoff: Duration::from_millis(self.crawl.retry_backoff_ms),
        }
    }

    pub fn gallery_limits(&self) -> GalleryLimits {
        GalleryLimits {
            max_steps: self.gallery.max_steps,
            max_wall_clock: Duration::from_secs(self.gallery.max_wall_clock_secs),
        }
    }
}

/// Paging and resumption behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Attempts per feed batch before the source is declared unavailable
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Initial backoff between attempts (milliseconds, doubled per attempt)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Items requested per feed batch
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// What to do when a progress file fails to parse
    #[serde(rename = "on-corrupt-state", default)]
    pub on_corrupt_state: CorruptStatePolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            page_size: default_page_size(),
            on_corrupt_state: CorruptStatePolicy::default(),
        }
    }
}

/// Ceilings on gallery viewer walks
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    /// Maximum viewer advances per trigger
    #[serde(rename = "max-steps", default = "default_gallery_steps")]
    pub max_steps: u32,

    /// Maximum wall-clock seconds per item
    #[serde(rename = "max-wall-clock-secs", default = "default_gallery_wall_clock")]
    pub max_wall_clock_secs: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            max_steps: default_gallery_steps(),
            max_wall_clock_secs: default_gallery_wall_clock(),
        }
    }
}

/// Where progress files and media land
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<target>_<kind>.json` progress files
    #[serde(rename = "progress-dir", default = "default_progress_dir")]
    pub progress_dir: String,

    /// Directory holding downloaded media, one subdirectory per target
    #[serde(rename = "media-dir", default = "default_media_dir")]
    pub media_dir: String,

    /// Whether media files are downloaded at all
    #[serde(rename = "download-media", default = "default_true")]
    pub download_media: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            progress_dir: default_progress_dir(),
            media_dir: default_media_dir(),
            download_media: true,
        }
    }
}

/// Crawler identification
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Per-platform feed endpoint and credentials
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Feed endpoint, with `{target}` substituted at crawl time
    pub endpoint: String,

    /// Bearer token for platforms that require one
    #[serde(rename = "bearer-token", default)]
    pub bearer_token: Option<String>,

    /// Query parameter carrying the page cursor
    #[serde(rename = "cursor-param", default = "default_cursor_param")]
    pub cursor_param: String,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_page_size() -> u32 {
    20
}

fn default_gallery_steps() -> u32 {
    50
}

fn default_gallery_wall_clock() -> u64 {
    240
}

fn default_progress_dir() -> String {
    "./progress".to_string()
}

fn default_media_dir() -> String {
    "./media".to_string()
}

fn default_cursor_param() -> String {
    "pagination_token".to_string()
}

fn default_true() -> bool {
    true
}
