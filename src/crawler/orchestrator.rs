//! Top-level crawl loop
//!
//! The orchestrator wires the pager, gallery navigator, downloader, and
//! progress store into a single resumable run: load state, page the feed,
//! enrich each new item with gallery media, download best-effort, commit.
//! Per-item and per-media failures are recorded and never abort the run;
//! only store failures (and corrupt state under the abort policy) do.

use super::cancel::CancelFlag;
use super::summary::CrawlSummary;
use crate::gallery::{GalleryLimits, GalleryNavigator};
use crate::pager::{FeedPager, RetryPolicy, StopPolicy, TerminationReason};
use crate::source::{Downloader, FeedSource, GalleryProvider};
use crate::store::{CorruptStatePolicy, ProgressState, ProgressStore, StoreError};
use std::time::Instant;

pub struct CrawlOrchestrator<S: ProgressStore> {
    store: S,
    stop_policy: StopPolicy,
    retry: RetryPolicy,
    gallery_limits: GalleryLimits,
    corrupt_policy: CorruptStatePolicy,
    cancel: CancelFlag,
}

impl<S: ProgressStore> CrawlOrchestrator<S> {
    pub fn new(store: S, stop_policy: StopPolicy) -> Self {
        Self {
            store,
            stop_policy,
            retry: RetryPolicy::default(),
            gallery_limits: GalleryLimits::default(),
            corrupt_policy: CorruptStatePolicy::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_gallery_limits(mut self, limits: GalleryLimits) -> Self {
        self.gallery_limits = limits;
        self
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptStatePolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Flag that stops this run between items when set
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs one crawl against a target, resuming from its progress file
    ///
    /// A source that stays unavailable ends the run with a partial summary
    /// whose termination reason maps to a failing exit. Store errors
    /// propagate.
    pub async fn run(
        &mut self,
        target: &str,
        kind: &str,
        source: &mut dyn FeedSource,
        provider: &mut dyn GalleryProvider,
        mut downloader: Option<&mut dyn Downloader>,
    ) -> crate::Result<CrawlSummary> {
        let started = Instant::now();
        let mut state = self.load_state(target, kind)?;
        tracing::info!(
            target_name = target,
            kind,
            resumed_items = state.len(),
            "Starting crawl"
        );

        let mut pager = FeedPager::new(source, self.stop_policy, self.retry);
        let mut navigator = GalleryNavigator::new(self.gallery_limits);
        let mut accepted = 0u64;
        let mut media_downloaded = 0u64;

        let termination = loop {
            if self.cancel.is_cancelled() {
                tracing::info!(target_name = target, "Crawl cancelled");
                break TerminationReason::Cancelled;
            }

            let mut envelope = match pager.next_candidate(&state).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    break pager
                        .termination_reason()
                        .unwrap_or(TerminationReason::EndOfFeed)
                }
                Err(e) => {
                    tracing::error!(target_name = target, "Feed source gave up: {}", e);
                    break TerminationReason::SourceUnavailable;
                }
            };

            let outcome = navigator.collect(provider, &envelope).await;
            if outcome.partial {
                tracing::warn!(
                    identity = %envelope.identity,
                    media = outcome.media.len(),
                    "Media extraction incomplete for item"
                );
            }
            envelope.extend_media(outcome.media);

            if let Some(dl) = downloader.as_mut() {
                for media in envelope.media.iter_mut() {
                    match dl.fetch(media).await {
                        Ok(path) => {
                            media.local_path = Some(path);
                            media_downloaded += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                url = %media.source_url,
                                "Media download failed: {}",
                                e
                            );
                        }
                    }
                }
            }

            if self.store.commit(&mut state, &envelope)? {
                accepted += 1;
            }
        };

        let summary = CrawlSummary {
            target: target.to_string(),
            kind: kind.to_string(),
            accepted,
            media_downloaded,
            termination,
            elapsed: started.elapsed(),
        };
        tracing::info!(target_name = target, "Crawl finished: {}", summary);
        Ok(summary)
    }

    /// Loads progress, applying the corrupt-state policy
    fn load_state(&self, target: &str, kind: &str) -> crate::Result<ProgressState> {
        match self.store.load(target, kind) {
            Ok(state) => Ok(state),
            Err(StoreError::Corrupt { path, message }) => match self.corrupt_policy {
                CorruptStatePolicy::Abort => {
                    Err(StoreError::Corrupt { path, message }.into())
                }
                CorruptStatePolicy::Reset => {
                    tracing::warn!(
                        path = %path,
                        "Progress file corrupt ({}), starting fresh",
                        message
                    );
                    Ok(ProgressState::new(target, kind))
                }
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemEnvelope, MediaRef, RawItem};
    use crate::source::{Batch, Cursor, SourceError, TriggerHandle};
    use crate::store::JsonProgressStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedSource {
        script: VecDeque<Result<Batch, SourceError>>,
    }

    impl ScriptedSource {
        fn with_ids(batches: &[&[&str]]) -> Self {
            let total = batches.len();
            Self {
                script: batches
                    .iter()
                    .enumerate()
                    .map(|(i, ids)| {
                        Ok(Batch {
                            items: ids
                                .iter()
                                .map(|id| {
                                    let mut raw = RawItem::new();
                                    raw.insert("id".to_string(), json!(id));
                                    raw
                                })
                                .collect(),
                            next_cursor: if i + 1 < total {
                                Some(Cursor::new(format!("p{}", i + 1)))
                            } else {
                                None
                            },
                        })
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl crate::source::FeedSource for ScriptedSource {
        async fn next_batch(&mut self, _cursor: Option<&Cursor>) -> Result<Batch, SourceError> {
            self.script.pop_front().unwrap_or_else(|| Ok(Batch::default()))
        }
    }

    /// Provider with no galleries and no visible media
    struct NoMedia;

    #[async_trait]
    impl GalleryProvider for NoMedia {
        async fn find_triggers(&mut self, _item: &ItemEnvelope) -> Vec<TriggerHandle> {
            Vec::new()
        }
        async fn visible_media(&mut self, _item: &ItemEnvelope) -> Vec<MediaRef> {
            Vec::new()
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

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
        }
    }

    fn orchestrator(dir: &TempDir) -> CrawlOrchestrator<JsonProgressStore> {
        CrawlOrchestrator::new(JsonProgressStore::new(dir.path()), StopPolicy::Unbounded)
            .with_retry(fast_retry())
    }

    #[tokio::test]
    async fn test_run_commits_new_items() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        let mut source = ScriptedSource::with_ids(&[&["a", "b"], &["c"]]);

        let summary = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.termination, TerminationReason::EndOfFeed);
    }

    #[tokio::test]
    async fn test_second_run_accepts_nothing() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);

        let mut source = ScriptedSource::with_ids(&[&["a", "b"]]);
        let first = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await
            .unwrap();
        assert_eq!(first.accepted, 2);

        let mut source = ScriptedSource::with_ids(&[&["a", "b"]]);
        let second = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await
            .unwrap();
        assert_eq!(second.accepted, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        orch.cancel_flag().cancel();

        let mut source = ScriptedSource::with_ids(&[&["a"]]);
        let summary = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.termination, TerminationReason::Cancelled);
    }

    #[tokio::test]
    async fn test_unavailable_source_yields_partial_summary() {
        struct AlwaysDown;

        #[async_trait]
        impl crate::source::FeedSource for AlwaysDown {
            async fn next_batch(&mut self, _cursor: Option<&Cursor>) -> Result<Batch, SourceError> {
                Err(SourceError::Request("connection refused".to_string()))
            }
        }

        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        let summary = orch
            .run("alice", "profile", &mut AlwaysDown, &mut NoMedia, None)
            .await
            .unwrap();

        assert_eq!(summary.termination, TerminationReason::SourceUnavailable);
        assert!(summary.termination.is_error());
    }

    #[tokio::test]
    async fn test_corrupt_state_aborts_by_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("alice_profile.json"), "{ not json").unwrap();

        let mut orch = orchestrator(&dir);
        let mut source = ScriptedSource::with_ids(&[&["a"]]);
        let result = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_state_reset_starts_fresh() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("alice_profile.json"), "{ not json").unwrap();

        let mut orch = orchestrator(&dir).with_corrupt_policy(CorruptStatePolicy::Reset);
        let mut source = ScriptedSource::with_ids(&[&["a", "b"]]);
        let summary = orch
            .run("alice", "profile", &mut source, &mut NoMedia, None)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 2);
    }
}
