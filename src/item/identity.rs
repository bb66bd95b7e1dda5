//! Identity derivation for raw feed items
//!
//! `identity_of` is a pure function of the raw item data: the same raw item
//! always produces the same identity, with no side effects. Stable URL/ID
//! fields are preferred; items without one fall back to a content hash of
//! (author, normalized text, hour bucket), which may collide.

use crate::item::{ItemIdentity, RawItem};
use crate::IdentityError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Fields that carry a canonical post URL or platform ID, in preference order
const ID_FIELDS: &[&str] = &["url", "link", "feed_url", "id"];

/// Fields that may carry the author for the content-hash fallback
const AUTHOR_FIELDS: &[&str] = &["author", "username", "sender_id", "author_id"];

/// Fields that may carry the post text for the content-hash fallback
const TEXT_FIELDS: &[&str] = &["text", "content", "title", "caption"];

/// Fields that may carry the post timestamp for the content-hash fallback
const DATE_FIELDS: &[&str] = &["date", "publish_date", "created_at"];

/// Derives the canonical identity of a raw feed item
///
/// Preference order:
/// 1. A non-empty `url`, `link`, `feed_url`, or `id` field (strings and
///    numbers both accepted; numbers are used in decimal form).
/// 2. A content hash over (author, whitespace-normalized lowercase text,
///    timestamp bucketed to the hour), prefixed with `sha256:`.
///
/// Fails with [`IdentityError::MalformedItem`] when the item has neither a
/// stable ID field nor enough content for the fallback.
pub fn identity_of(raw: &RawItem) -> Result<ItemIdentity, IdentityError> {
    for field in ID_FIELDS {
        if let Some(id) = scalar_field(raw, field) {
            return Ok(ItemIdentity::new(id));
        }
    }

    content_hash_identity(raw).ok_or_else(|| {
        IdentityError::MalformedItem(
            "no stable URL/ID field and no (author, text) for content hash".to_string(),
        )
    })
}

/// Reads a field as a non-empty string, accepting strings and numbers
fn scalar_field(raw: &RawItem, field: &str) -> Option<String> {
    match raw.get(field)? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Heuristic fallback identity for items without a canonical URL or ID
fn content_hash_identity(raw: &RawItem) -> Option<ItemIdentity> {
    let author = AUTHOR_FIELDS.iter().find_map(|f| scalar_field(raw, f))?;
    let text = TEXT_FIELDS.iter().find_map(|f| scalar_field(raw, f))?;
    let bucket = DATE_FIELDS
        .iter()
        .find_map(|f| scalar_field(raw, f))
        .and_then(|s| parse_timestamp(&s))
        .map(|dt| dt.format("%Y-%m-%dT%H").to_string())
        .unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(author.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_text(&text).as_bytes());
    hasher.update(b"\n");
    hasher.update(bucket.as_bytes());
    let digest = hex::encode(hasher.finalize());

    Some(ItemIdentity::new(format!("sha256:{}", &digest[..16])))
}

/// Collapses whitespace runs and lowercases, so cosmetic re-rendering of the
/// same post hashes identically
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses RFC 3339 or the `YYYY-MM-DD HH:MM:SS` form the platforms emit
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
