//! Progress store for persisting crawl state
//!
//! One progress file per target holds every item ever accepted for it. The
//! store is append-only and persists synchronously on every commit, so a
//! crash loses at most the single in-flight item. The file shape
//! (`target` / `type` / `items` with `id`, `date`, `text`, `media_type`,
//! `media_path` per item) is a stable contract consumed by downstream
//! tooling; field names must stay backward-compatible.

mod json;

pub use json::JsonProgressStore;

use crate::item::{ItemEnvelope, ItemIdentity, MediaRef, RawItem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during progress store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Corrupt progress file {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// What to do when a progress file exists but cannot be parsed
///
/// `Abort` is the default: a readable-but-broken file is never silently
/// replaced. `Reset` logs the corruption and starts the target fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStatePolicy {
    Abort,
    Reset,
}

impl Default for CorruptStatePolicy {
    fn default() -> Self {
        Self::Abort
    }
}

/// One item as persisted in the progress file
///
/// `extra` carries the remaining raw platform fields, flattened so the file
/// keeps the original spider output shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: ItemIdentity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,

    #[serde(flatten)]
    pub extra: RawItem,
}

/// Keys the contract fields above are drawn from; kept out of `extra` so
/// flattening never emits a duplicate JSON key
const CONTRACT_KEYS: &[&str] = &["id", "date", "text", "media_type", "media_path", "media"];

impl StoredItem {
    /// Projects a frozen envelope onto the persisted item shape
    pub fn from_envelope(envelope: &ItemEnvelope) -> Self {
        let date = ["date", "publish_date", "created_at"]
            .iter()
            .find_map(|k| envelope.raw_str(k))
            .map(str::to_string);
        let text = ["text", "content", "title", "caption"]
            .iter()
            .find_map(|k| envelope.raw_str(k))
            .map(str::to_string);

        let first_media = envelope.media.first();
        let media_type = first_media.map(|m| m.kind.as_str().to_string());
        let media_path = first_media
            .and_then(|m| m.local_path.as_ref())
            .map(|p| p.display().to_string());

        let extra: RawItem = envelope
            .raw
            .iter()
            .filter(|(k, _)| !CONTRACT_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            id: envelope.identity.clone(),
            date,
            text,
            media_type,
            media_path,
            media: envelope.media.clone(),
            extra,
        }
    }
}

/// In-memory progress state for one target
///
/// Invariant: `seen` always equals the set of identities in `items`. It is
/// rebuilt on load and only ever grows, one identity per accepted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressState {
    pub target: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub items: Vec<StoredItem>,

    #[serde(skip)]
    pub seen: HashSet<ItemIdentity>,
}

impl ProgressState {
    /// Creates an empty state for a target
    pub fn new(target: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: kind.into(),
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Rebuilds `seen` from `items`, failing if the file held duplicates
    pub(crate) fn rebuild_seen(&mut self) -> Result<(), ItemIdentity> {
        self.seen.clear();
        for item in &self.items {
            if !self.seen.insert(item.id.clone()) {
                return Err(item.id.clone());
            }
        }
        Ok(())
    }

    /// Whether this identity has already been accepted
    pub fn contains(&self, identity: &ItemIdentity) -> bool {
        self.seen.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Trait for progress store backends
///
/// A single instance serializes commits by taking `&mut self`; concurrent
/// external processes writing the same target are a caller responsibility
/// (typically advisory file locking) and otherwise undefined behavior.
pub trait ProgressStore {
    /// Loads persisted state for a target, or an empty state if none exists
    fn load(&self, target: &str, kind: &str) -> StoreResult<ProgressState>;

    /// Appends a new item and synchronously persists the full state
    ///
    /// Idempotent by construction: committing an identity already in
    /// `state.seen` is a no-op that leaves storage untouched. Returns
    /// whether the item was actually appended.
    fn commit(&mut self, state: &mut ProgressState, envelope: &ItemEnvelope) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{MediaKind, MediaRef};
    use serde_json::json;

    fn envelope(id: &str, text: &str) -> ItemEnvelope {
        let mut raw = RawItem::new();
        raw.insert("id".to_string(), json!(id));
        raw.insert("text".to_string(), json!(text));
        raw.insert("views".to_string(), json!(12));
        ItemEnvelope::from_raw(raw).unwrap()
    }

    #[test]
    fn test_stored_item_contract_fields() {
        let mut env = envelope("42", "hello");
        let mut media = MediaRef::new("https://cdn.example.com/a.jpg", MediaKind::Image);
        media.local_path = Some("/tmp/a.jpg".into());
        env.media.push(media);

        let stored = StoredItem::from_envelope(&env);
        assert_eq!(stored.id.as_str(), "42");
        assert_eq!(stored.text.as_deref(), Some("hello"));
        assert_eq!(stored.media_type.as_deref(), Some("image"));
        assert_eq!(stored.media_path.as_deref(), Some("/tmp/a.jpg"));
        // contract fields are not repeated in extra
        assert!(!stored.extra.contains_key("id"));
        assert!(!stored.extra.contains_key("text"));
        assert_eq!(stored.extra["views"], json!(12));
    }

    #[test]
    fn test_stored_item_serializes_type_tag() {
        let mut state = ProgressState::new("alice", "profile");
        state.items.push(StoredItem::from_envelope(&envelope("1", "a")));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["target"], "alice");
        assert_eq!(value["type"], "profile");
        assert_eq!(value["items"][0]["id"], "1");
        assert!(value.get("seen").is_none());
    }

    #[test]
    fn test_rebuild_seen_detects_duplicates() {
        let mut state = ProgressState::new("alice", "profile");
        state.items.push(StoredItem::from_envelope(&envelope("1", "a")));
        state.items.push(StoredItem::from_envelope(&envelope("1", "b")));
        assert!(state.rebuild_seen().is_err());
    }

    #[test]
    fn test_seen_matches_items() {
        let mut state = ProgressState::new("alice", "profile");
        state.items.push(StoredItem::from_envelope(&envelope("1", "a")));
        state.items.push(StoredItem::from_envelope(&envelope("2", "b")));
        state.rebuild_seen().unwrap();
        assert_eq!(state.seen.len(), state.items.len());
        assert!(state.contains(&ItemIdentity::new("1")));
        assert!(!state.contains(&ItemIdentity::new("3")));
    }
}
