//! Capability traits for platform collaborators
//!
//! The engine never talks to a browser, a platform API, or a CDN directly.
//! It consumes three narrow capabilities, implemented per platform:
//!
//! - [`FeedSource`]: paginated/scrolling retrieval of raw feed items
//! - [`GalleryProvider`]: nested photo-viewer navigation for one item
//! - [`Downloader`]: authenticated media file retrieval
//!
//! The browser or API session resource is owned by the provider and released
//! when it is dropped at the end of a run.

mod api;
mod embedded;

pub use api::{ApiFeedSource, ApiSourceConfig};
pub use embedded::EmbeddedMediaProvider;

use crate::item::{ItemEnvelope, MediaRef, RawItem};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from a feed source
#[derive(Debug, Error)]
pub enum SourceError {
    /// A single `next_batch` call failed; the pager may retry it
    #[error("Feed request failed: {0}")]
    Request(String),

    /// The source responded with something the provider could not decode
    #[error("Feed response decode failed: {0}")]
    Decode(String),

    /// Retries are exhausted; terminal for this run
    #[error("Feed source unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },
}

/// Errors from a media downloader; never fatal to a run
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download request failed: {0}")]
    Http(String),

    #[error("Download returned HTTP {0}")]
    Status(u16),

    #[error("Failed to write media file: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque pagination token returned by a feed source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of raw feed items plus the cursor for the next page
#[derive(Debug, Default)]
pub struct Batch {
    /// Raw items in source order
    pub items: Vec<RawItem>,

    /// Cursor for the next batch; `None` means the feed is exhausted
    pub next_cursor: Option<Cursor>,
}

/// Opaque handle to a gallery trigger found on an item
///
/// Minted by the [`GalleryProvider`]; the engine only passes it back to
/// `activate` and compares it for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerHandle {
    pub id: String,
}

impl TriggerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Site-specific paging/scrolling/API-pagination logic
#[async_trait]
pub trait FeedSource: Send {
    /// Fetches the batch at `cursor` (`None` for the first page)
    async fn next_batch(&mut self, cursor: Option<&Cursor>) -> Result<Batch, SourceError>;
}

/// Site-specific gallery/viewer navigation for a single item
///
/// The viewer holds position state between `activate`, `current_media`, and
/// `advance` calls; the engine drives it strictly sequentially.
#[async_trait]
pub trait GalleryProvider: Send {
    /// Scans the item's rendered content for gallery triggers
    ///
    /// Implementations should de-duplicate triggers that open the same
    /// gallery where they can; the engine treats that as best-effort and
    /// relies on media-URL dedup for correctness.
    async fn find_triggers(&mut self, item: &ItemEnvelope) -> Vec<TriggerHandle>;

    /// Media directly visible on the item without opening a viewer
    async fn visible_media(&mut self, item: &ItemEnvelope) -> Vec<MediaRef>;

    /// Activates a trigger, opening its viewer; false if the viewer
    /// did not open
    async fn activate(&mut self, trigger: &TriggerHandle) -> bool;

    /// The media currently displayed in the open viewer, if any
    async fn current_media(&mut self) -> Option<MediaRef>;

    /// Advances the viewer to the next media; false at the end
    async fn advance(&mut self) -> bool;
}

/// HTTP/session-authenticated media file retrieval
#[async_trait]
pub trait Downloader: Send {
    /// Fetches the media to local storage and returns the saved path
    async fn fetch(&mut self, media: &MediaRef) -> Result<PathBuf, DownloadError>;
}
