//! Media download to local files
//!
//! Downloads are best-effort: a failed fetch is recorded on the item and
//! never aborts a run. Filenames are derived from the source URL hash so a
//! re-download of the same media lands on the same path.

use crate::item::{MediaKind, MediaRef};
use crate::source::{DownloadError, Downloader};
use async_trait::async_trait;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const FILENAME_HASH_LEN: usize = 12;

/// Downloads media over HTTP into `<media_dir>/<target>/`
pub struct HttpDownloader {
    client: reqwest::Client,
    media_dir: PathBuf,
    target: String,
}

impl HttpDownloader {
    pub fn new(
        media_dir: impl Into<PathBuf>,
        target: impl Into<String>,
        user_agent: &str,
    ) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            media_dir: media_dir.into(),
            target: target.into(),
        })
    }

    /// Replaces the HTTP client, used by tests to point at a mock server
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn destination(&self, media: &MediaRef, content_type: Option<&str>) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(media.source_url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        let name = format!(
            "{}.{}",
            &digest[..FILENAME_HASH_LEN],
            extension_for(media, content_type)
        );
        self.media_dir.join(&self.target).join(name)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&mut self, media: &MediaRef) -> Result<PathBuf, DownloadError> {
        let response = self
            .client
            .get(&media.source_url)
            .send()
            .await
            .map_err(|e| DownloadError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let path = self.destination(media, content_type.as_deref());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Http(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(url = %media.source_url, path = %path.display(), "Downloaded media");
        Ok(path)
    }
}

/// Picks a file extension from the Content-Type header, falling back to
/// the URL path and then to a default for the media kind
fn extension_for(media: &MediaRef, content_type: Option<&str>) -> &'static str {
    match content_type.map(|ct| ct.split(';').next().unwrap_or("").trim()) {
        Some("image/jpeg") => return "jpg",
        Some("image/png") => return "png",
        Some("image/webp") => return "webp",
        Some("image/gif") => return "gif",
        Some("video/mp4") => return "mp4",
        _ => {}
    }

    if let Some(ext) = url_extension(&media.source_url) {
        return ext;
    }

    match media.kind {
        MediaKind::Image => "jpg",
        MediaKind::Video => "mp4",
        MediaKind::Unknown => "bin",
    }
}

fn url_extension(source_url: &str) -> Option<&'static str> {
    let path = url::Url::parse(source_url).ok()?.path().to_lowercase();
    let ext = Path::new(&path).extension()?.to_str()?.to_string();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        "mp4" => Some("mp4"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader(dir: &TempDir) -> HttpDownloader {
        HttpDownloader::new(dir.path(), "alice", "driftnet-test/0.1").unwrap()
    }

    #[tokio::test]
    async fn test_downloads_to_target_subdirectory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"pngdata".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut downloader = downloader(&dir);
        let media = MediaRef::new(format!("{}/media/1", server.uri()), MediaKind::Image);

        let saved = downloader.fetch(&media).await.unwrap();
        assert!(saved.starts_with(dir.path().join("alice")));
        assert_eq!(saved.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&saved).unwrap(), b"pngdata");
    }

    #[tokio::test]
    async fn test_same_url_maps_to_same_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut downloader = downloader(&dir);
        let media = MediaRef::new(format!("{}/a.jpg", server.uri()), MediaKind::Image);

        let first = downloader.fetch(&media).await.unwrap();
        let second = downloader.fetch(&media).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let mut downloader = downloader(&dir);
        let media = MediaRef::new(format!("{}/gone.jpg", server.uri()), MediaKind::Image);

        let result = downloader.fetch(&media).await;
        assert!(matches!(result, Err(DownloadError::Status(404))));
    }

    #[test]
    fn test_extension_prefers_content_type() {
        let media = MediaRef::new("https://cdn.example.com/file.png", MediaKind::Image);
        assert_eq!(extension_for(&media, Some("image/webp")), "webp");
    }

    #[test]
    fn test_extension_falls_back_to_url_then_kind() {
        let from_url = MediaRef::new("https://cdn.example.com/clip.MP4?tag=1", MediaKind::Unknown);
        assert_eq!(extension_for(&from_url, None), "mp4");

        let bare = MediaRef::new("https://cdn.example.com/media/42", MediaKind::Video);
        assert_eq!(extension_for(&bare, Some("application/octet-stream")), "mp4");

        let unknown = MediaRef::new("https://cdn.example.com/media/42", MediaKind::Unknown);
        assert_eq!(extension_for(&unknown, None), "bin");
    }
}
