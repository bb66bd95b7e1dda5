//! Feed pager: incremental retrieval of a feed until a stop condition
//!
//! The pager turns a batch-oriented [`FeedSource`] into a stream of
//! previously-unseen candidate items. De-duplication is checked against the
//! live progress state on every candidate, so items committed in earlier
//! runs (or earlier in this run) are never yielded again. Source failures
//! are retried with exponential backoff before the run is declared
//! unavailable.

use crate::item::{identity_of, ItemEnvelope, ItemIdentity};
use crate::source::{Cursor, FeedSource, SourceError};
use crate::store::ProgressState;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Duration;

/// When a crawl should stop accepting new items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop after this many accepted items
    ByCount(u64),

    /// Stop after this many consecutive batches with no new items
    ByNoNewContent(u32),

    /// Run until the feed itself ends
    Unbounded,
}

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The idle-batch threshold was reached with no new content
    Exhausted,

    /// The source reported no further pages
    EndOfFeed,

    /// The configured item count was reached
    LimitReached,

    /// A cooperative stop was requested between items
    Cancelled,

    /// The source stayed unreachable through all retries
    SourceUnavailable,
}

impl TerminationReason {
    /// True for reasons that map to a non-zero process exit
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SourceUnavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::EndOfFeed => "end_of_feed",
            Self::LimitReached => "limit_reached",
            Self::Cancelled => "cancelled",
            Self::SourceUnavailable => "source_unavailable",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounded retry with exponential backoff, applied uniformly at the
/// pager boundary
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff before retrying after the given failed attempt (1-based),
    /// doubling per attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

/// Produces previously-unseen candidate envelopes from a feed source
pub struct FeedPager<'a> {
    source: &'a mut dyn FeedSource,
    policy: StopPolicy,
    retry: RetryPolicy,
    cursor: Option<Cursor>,
    buffer: VecDeque<ItemEnvelope>,
    /// Identities yielded during this run, committed or not
    yielded: HashSet<ItemIdentity>,
    /// Identity list of the previous batch, for cursor-stall detection
    last_batch_ids: Vec<ItemIdentity>,
    idle_batches: u32,
    accepted: u64,
    finished: Option<TerminationReason>,
    feed_ended: bool,
}

impl<'a> FeedPager<'a> {
    pub fn new(source: &'a mut dyn FeedSource, policy: StopPolicy, retry: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            retry,
            cursor: None,
            buffer: VecDeque::new(),
            yielded: HashSet::new(),
            last_batch_ids: Vec::new(),
            idle_batches: 0,
            accepted: 0,
            finished: None,
            feed_ended: false,
        }
    }

    /// Why the pager stopped; `None` while it is still producing
    pub fn termination_reason(&self) -> Option<TerminationReason> {
        self.finished
    }

    /// Number of candidates yielded so far
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Returns the next previously-unseen candidate, or `None` once the
    /// stop policy or the feed ends the run
    ///
    /// `state` must be the live progress state so items committed by
    /// earlier runs are skipped, not just items from this run.
    pub async fn next_candidate(
        &mut self,
        state: &ProgressState,
    ) -> Result<Option<ItemEnvelope>, SourceError> {
        loop {
            if self.finished.is_some() {
                return Ok(None);
            }

            if let StopPolicy::ByCount(limit) = self.policy {
                if self.accepted >= limit {
                    self.finish(TerminationReason::LimitReached);
                    return Ok(None);
                }
            }

            if let Some(envelope) = self.buffer.pop_front() {
                if state.contains(&envelope.identity) {
                    tracing::debug!(identity = %envelope.identity, "Skipping already-committed item");
                    continue;
                }
                self.accepted += 1;
                return Ok(Some(envelope));
            }

            if self.feed_ended {
                self.finish(TerminationReason::EndOfFeed);
                return Ok(None);
            }

            self.fetch_next_batch(state).await?;
        }
    }

    /// Fetches one batch, filters candidates, and updates idle tracking
    async fn fetch_next_batch(&mut self, state: &ProgressState) -> Result<(), SourceError> {
        let batch = self.fetch_with_retry().await?;

        let mut batch_ids = Vec::with_capacity(batch.items.len());
        let mut candidates = Vec::new();
        let mut new_items = 0usize;

        for raw in batch.items {
            let identity = match identity_of(&raw) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("Skipping malformed feed item: {}", e);
                    continue;
                }
            };
            batch_ids.push(identity.clone());

            if state.contains(&identity) || self.yielded.contains(&identity) {
                continue;
            }
            self.yielded.insert(identity.clone());
            new_items += 1;
            candidates.push(ItemEnvelope {
                identity,
                fetched_at: chrono::Utc::now(),
                raw,
                media: Vec::new(),
            });
        }

        // A batch identical to the previous one means the cursor failed to
        // advance (the scroll-height-unchanged condition); it counts as
        // idle even when its items look new.
        let stalled = !batch_ids.is_empty() && batch_ids == self.last_batch_ids;
        if stalled {
            tracing::debug!("Cursor did not advance, treating repeated batch as idle");
            candidates.clear();
            new_items = 0;
        }
        self.last_batch_ids = batch_ids;

        if new_items == 0 {
            self.idle_batches += 1;
            if let StopPolicy::ByNoNewContent(max_idle) = self.policy {
                if self.idle_batches >= max_idle {
                    self.finish(TerminationReason::Exhausted);
                    return Ok(());
                }
            }
        } else {
            self.idle_batches = 0;
        }

        self.buffer.extend(candidates);

        match batch.next_cursor {
            Some(cursor) => self.cursor = Some(cursor),
            None => self.feed_ended = true,
        }

        Ok(())
    }

    /// Calls `next_batch` with bounded retries and exponential backoff
    async fn fetch_with_retry(&mut self) -> Result<crate::source::Batch, SourceError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.source.next_batch(self.cursor.as_ref()).await {
                Ok(batch) => return Ok(batch),
                Err(e) if attempt >= self.retry.max_attempts => {
                    let unavailable = SourceError::Unavailable {
                        attempts: attempt,
                        last_error: e.to_string(),
                    };
                    self.finish(TerminationReason::SourceUnavailable);
                    return Err(unavailable);
                }
                Err(e) => {
                    let wait = self.retry.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        "Feed batch failed ({}), retrying in {:?}",
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    fn finish(&mut self, reason: TerminationReason) {
        if self.finished.is_none() {
            tracing::info!(reason = %reason, accepted = self.accepted, "Pager finished");
            self.finished = Some(reason);
        }
    }
}
