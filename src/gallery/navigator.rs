//! Bounded walk through a platform's media gallery viewer
//!
//! Gallery viewers are frequently circular or broken, so every walk is
//! bounded three ways: a repeat of the previous media URL, a step ceiling,
//! and a wall-clock ceiling. A trigger that fails to activate is skipped;
//! when every trigger fails the navigator falls back to media already
//! visible on the item.

use super::state::NavState;
use crate::item::{ItemEnvelope, MediaRef};
use crate::source::GalleryProvider;
use std::time::{Duration, Instant};

/// Ceilings applied to a single item's gallery walk
#[derive(Debug, Clone, Copy)]
pub struct GalleryLimits {
    /// Maximum viewer advances per trigger
    pub max_steps: u32,

    /// Maximum wall-clock time for the whole item
    pub max_wall_clock: Duration,
}

impl Default for GalleryLimits {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_wall_clock: Duration::from_secs(240),
        }
    }
}

/// Result of collecting media for a single item
#[derive(Debug, Clone, Default)]
pub struct GalleryOutcome {
    /// Media in discovery order, de-duplicated by source URL
    pub media: Vec<MediaRef>,

    /// True when at least one trigger failed or a ceiling cut the walk
    /// short, so the media list may be incomplete
    pub partial: bool,
}

/// Walks gallery viewers for one item at a time
pub struct GalleryNavigator {
    limits: GalleryLimits,
    state: NavState,
}

impl GalleryNavigator {
    pub fn new(limits: GalleryLimits) -> Self {
        Self {
            limits,
            state: NavState::Closed,
        }
    }

    /// State reached by the most recent walk
    pub fn state(&self) -> NavState {
        self.state
    }

    /// Collects all media reachable from the item's gallery triggers
    ///
    /// Never silently empty: if triggers exist but produce nothing, the
    /// outcome is marked partial and a warning is logged.
    pub async fn collect(
        &mut self,
        provider: &mut dyn GalleryProvider,
        item: &ItemEnvelope,
    ) -> GalleryOutcome {
        let started = Instant::now();
        let mut outcome = GalleryOutcome::default();
        self.state = NavState::Closed;

        let triggers = provider.find_triggers(item).await;
        if triggers.is_empty() {
            tracing::debug!(identity = %item.identity, "No gallery triggers, using visible media");
            push_unique(&mut outcome.media, provider.visible_media(item).await);
            self.state = NavState::Exhausted;
            return outcome;
        }

        let mut any_opened = false;
        for trigger in &triggers {
            if started.elapsed() >= self.limits.max_wall_clock {
                tracing::warn!(
                    identity = %item.identity,
                    "Gallery wall-clock ceiling reached, remaining triggers skipped"
                );
                outcome.partial = true;
                break;
            }

            self.state = NavState::TriggerFound;
            if !provider.activate(trigger).await {
                tracing::warn!(
                    identity = %item.identity,
                    trigger = %trigger.id,
                    "Gallery trigger failed to activate"
                );
                self.state = NavState::Failed;
                outcome.partial = true;
                continue;
            }

            any_opened = true;
            self.state = NavState::ViewerOpen;
            self.walk_viewer(provider, started, &mut outcome).await;
        }

        if !any_opened {
            // Every trigger failed; salvage whatever the item exposes
            // without a viewer.
            push_unique(&mut outcome.media, provider.visible_media(item).await);
        }

        if outcome.media.is_empty() {
            tracing::warn!(
                identity = %item.identity,
                triggers = triggers.len(),
                "Gallery triggers present but no media extracted"
            );
            outcome.partial = true;
        }

        outcome
    }

    /// Steps through one open viewer until a stop condition fires
    async fn walk_viewer(
        &mut self,
        provider: &mut dyn GalleryProvider,
        started: Instant,
        outcome: &mut GalleryOutcome,
    ) {
        let mut previous_url: Option<String> = None;
        let mut steps = 0u32;

        loop {
            if steps >= self.limits.max_steps {
                tracing::warn!(steps, "Gallery step ceiling reached");
                self.state = NavState::Exhausted;
                outcome.partial = true;
                return;
            }
            if started.elapsed() >= self.limits.max_wall_clock {
                tracing::warn!("Gallery wall-clock ceiling reached mid-walk");
                self.state = NavState::Exhausted;
                outcome.partial = true;
                return;
            }

            if let Some(media) = provider.current_media().await {
                // A repeat of the previous position means the viewer
                // wrapped around or stopped moving.
                if previous_url.as_deref() == Some(media.source_url.as_str()) {
                    self.state = NavState::Exhausted;
                    return;
                }
                previous_url = Some(media.source_url.clone());
                push_unique(&mut outcome.media, [media]);
            }

            self.state = NavState::Navigating;
            steps += 1;
            if !provider.advance().await {
                self.state = NavState::Exhausted;
                return;
            }
        }
    }
}

fn push_unique(media: &mut Vec<MediaRef>, refs: impl IntoIterator<Item = MediaRef>) {
    for m in refs {
        if !media.iter().any(|existing| existing.source_url == m.source_url) {
            media.push(m);
        }
    }
}
