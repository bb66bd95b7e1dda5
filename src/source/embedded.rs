//! Media provider for feeds that embed media URLs in the item payload
//!
//! REST feeds carry their attachments inline, so there is no viewer to
//! walk: this provider exposes everything as visible media and reports no
//! gallery triggers.

use super::{GalleryProvider, TriggerHandle};
use crate::item::{ItemEnvelope, MediaKind, MediaRef};
use async_trait::async_trait;
use serde_json::Value;

/// Payload keys that may hold a list of attachments
const LIST_FIELDS: &[&str] = &["media", "attachments", "photos"];

/// Payload keys that may hold a single media URL
const SINGLE_FIELDS: &[(&str, MediaKind)] = &[
    ("video_url", MediaKind::Video),
    ("image_url", MediaKind::Image),
    ("photo", MediaKind::Image),
];

#[derive(Debug, Default)]
pub struct EmbeddedMediaProvider;

impl EmbeddedMediaProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GalleryProvider for EmbeddedMediaProvider {
    async fn find_triggers(&mut self, _item: &ItemEnvelope) -> Vec<TriggerHandle> {
        Vec::new()
    }

    async fn visible_media(&mut self, item: &ItemEnvelope) -> Vec<MediaRef> {
        let mut media = Vec::new();

        for field in LIST_FIELDS {
            if let Some(Value::Array(entries)) = item.raw.get(*field) {
                for entry in entries {
                    if let Some(m) = media_from_entry(entry) {
                        media.push(m);
                    }
                }
            }
        }

        for (field, kind) in SINGLE_FIELDS {
            if let Some(url) = item.raw.get(*field).and_then(|v| v.as_str()) {
                if !url.is_empty() {
                    media.push(MediaRef::new(url, *kind));
                }
            }
        }

        media
    }

    async fn activate(&mut self, _trigger: &TriggerHandle) -> bool {
        false
    }

    async fn current_media(&mut self) -> Option<MediaRef> {
        None
    }

    async fn advance(&mut self) -> bool {
        false
    }
}

/// Reads one attachment entry, either a bare URL string or an object with
/// a `url` / `media_url` / `src` field and an optional `type`
fn media_from_entry(entry: &Value) -> Option<MediaRef> {
    match entry {
        Value::String(url) if !url.is_empty() => Some(MediaRef::new(url, kind_from_url(url))),
        Value::Object(fields) => {
            let url = ["url", "media_url", "src"]
                .iter()
                .find_map(|k| fields.get(*k).and_then(|v| v.as_str()))
                .filter(|u| !u.is_empty())?;
            let kind = fields
                .get("type")
                .and_then(|v| v.as_str())
                .map(kind_from_label)
                .unwrap_or_else(|| kind_from_url(url));
            Some(MediaRef::new(url, kind))
        }
        _ => None,
    }
}

fn kind_from_label(label: &str) -> MediaKind {
    let label = label.to_ascii_lowercase();
    if label.contains("video") || label.contains("gif") {
        MediaKind::Video
    } else if label.contains("photo") || label.contains("image") {
        MediaKind::Image
    } else {
        MediaKind::Unknown
    }
}

fn kind_from_url(url: &str) -> MediaKind {
    let url = url.to_ascii_lowercase();
    if url.ends_with(".mp4") || url.contains("/video/") {
        MediaKind::Video
    } else if [".jpg", ".jpeg", ".png", ".webp", ".gif"]
        .iter()
        .any(|ext| url.ends_with(ext))
    {
        MediaKind::Image
    } else {
        MediaKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::RawItem;
    use serde_json::json;

    fn envelope(raw: serde_json::Value) -> ItemEnvelope {
        let mut map: RawItem = raw.as_object().unwrap().clone();
        map.insert("url".to_string(), json!("https://example.com/p/1"));
        ItemEnvelope::from_raw(map).unwrap()
    }

    #[tokio::test]
    async fn test_reads_attachment_objects() {
        let mut provider = EmbeddedMediaProvider::new();
        let item = envelope(json!({
            "media": [
                { "media_url": "https://cdn.example.com/a.jpg", "type": "photo" },
                { "url": "https://cdn.example.com/b.mp4", "type": "video" }
            ]
        }));

        let media = provider.visible_media(&item).await;
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].kind, MediaKind::Image);
        assert_eq!(media[1].kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_reads_bare_url_strings_and_single_fields() {
        let mut provider = EmbeddedMediaProvider::new();
        let item = envelope(json!({
            "photos": ["https://cdn.example.com/a.png"],
            "video_url": "https://cdn.example.com/clip.mp4"
        }));

        let media = provider.visible_media(&item).await;
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].source_url, "https://cdn.example.com/a.png");
        assert_eq!(media[1].kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_no_media_fields_yields_nothing() {
        let mut provider = EmbeddedMediaProvider::new();
        let item = envelope(json!({ "text": "plain post" }));

        assert!(provider.visible_media(&item).await.is_empty());
        assert!(provider.find_triggers(&item).await.is_empty());
    }

    #[test]
    fn test_kind_inference() {
        assert_eq!(kind_from_url("https://x/a.JPG"), MediaKind::Image);
        assert_eq!(kind_from_url("https://x/clip.mp4"), MediaKind::Video);
        assert_eq!(kind_from_url("https://x/page"), MediaKind::Unknown);
        assert_eq!(kind_from_label("animated_gif"), MediaKind::Video);
    }
}
