//! Item model for crawled feed entries
//!
//! An [`ItemEnvelope`] is created by the feed pager when an entry is first
//! observed, enriched with media by the gallery navigator, and frozen once
//! committed to the progress store.

mod identity;

pub use identity::identity_of;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Raw feed item as produced by a [`crate::source::FeedSource`]
pub type RawItem = serde_json::Map<String, serde_json::Value>;

/// Canonical de-duplication key for a crawled item
///
/// Opaque stable string: a post URL, a platform ID, or a `sha256:`-prefixed
/// content hash when the item carries neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIdentity(String);

impl ItemIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this identity was derived from a content hash
    /// rather than a stable URL or platform ID.
    pub fn is_content_hash(&self) -> bool {
        self.0.starts_with("sha256:")
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a media attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single media attachment discovered on an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Source URL of the media on the platform CDN
    pub source_url: String,

    /// Image, video, or unknown
    pub kind: MediaKind,

    /// Local file path, populated after a successful download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl MediaRef {
    pub fn new(source_url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            source_url: source_url.into(),
            kind,
            local_path: None,
        }
    }
}

/// A crawled feed item with its identity, raw fields, and resolved media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEnvelope {
    /// Canonical de-duplication key
    pub identity: ItemIdentity,

    /// When this item was first observed by the crawler
    pub fetched_at: DateTime<Utc>,

    /// Raw platform fields (text, author, timestamps, ...)
    pub raw: RawItem,

    /// Media attachments in discovery order
    pub media: Vec<MediaRef>,
}

impl ItemEnvelope {
    /// Builds an envelope from a raw item, deriving its identity
    pub fn from_raw(raw: RawItem) -> std::result::Result<Self, crate::IdentityError> {
        let identity = identity_of(&raw)?;
        Ok(Self {
            identity,
            fetched_at: Utc::now(),
            raw,
            media: Vec::new(),
        })
    }

    /// Returns a raw field as a string, if present and stringly-typed
    pub fn raw_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(|v| v.as_str())
    }

    /// Appends media refs, de-duplicating by source URL in first-seen order
    pub fn extend_media(&mut self, refs: impl IntoIterator<Item = MediaRef>) {
        for media in refs {
            if !self.media.iter().any(|m| m.source_url == media.source_url) {
                self.media.push(media);
            }
        }
    }
}
