//! One end-to-end monitoring run.
//!
//! A run walks a fixed sequence of phases:
//!
//! ```text
//! Idle -> Initializing -> ReconcilingHighlights -> ReconcilingStories
//!      -> SnapshottingProfile -> PersistingAuxiliary -> Done
//! ```
//!
//! Any error from the provider or the store moves the run to `Failed` and is
//! returned to the caller. Store state is saved after every recorded
//! highlight or story and after the snapshot, so the id lists never lag
//! behind the metadata log.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use thiserror::Error;
use tracing::Instrument;

use crate::metadata::{highlight_metadata, item_metadata, keyed_entry, story_metadata};
use crate::provider::{Highlight, Profile, Provider, Story, StoryItem};
use crate::reconcile::{compare_and_log, new_items, reconcile_profile_id, ProfileIdCheck};
use crate::snapshot::{build_snapshot, follower_changes, FollowerChanges};
use crate::store::{
    format_timestamp, Category, ItemMetadata, LocalStore, MonitorPaths, ProfileState, State,
};
use crate::types::StoryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Initializing,
    ReconcilingHighlights,
    ReconcilingStories,
    SnapshottingProfile,
    PersistingAuxiliary,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::ReconcilingHighlights => "reconciling highlights",
            Self::ReconcilingStories => "reconciling stories",
            Self::SnapshottingProfile => "snapshotting profile",
            Self::PersistingAuxiliary => "persisting auxiliary media",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that terminated abnormally, with the phase it was in.
#[derive(Debug, Error)]
#[error("Monitoring {profile} failed while {phase}: {source:#}")]
pub struct MonitorError {
    pub profile: String,
    pub phase: RunPhase,
    #[source]
    pub source: anyhow::Error,
}

/// Receives progress notifications from a [`Monitor`].
///
/// Injected per monitor instance; the default implementation forwards to
/// `tracing` inside the monitor's span.
pub trait RunObserver: Send + Sync {
    fn phase_changed(&self, _phase: RunPhase) {}

    fn highlight_saved(&self, _highlight: &Highlight, _items: usize) {}

    fn story_saved(&self, _story: &Story, _items: usize) {}
}

#[derive(Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn phase_changed(&self, phase: RunPhase) {
        tracing::debug!(%phase, "Phase changed");
    }

    fn highlight_saved(&self, highlight: &Highlight, items: usize) {
        tracing::debug!(id = %highlight.id, items, "Saved highlight");
    }

    fn story_saved(&self, story: &Story, items: usize) {
        tracing::debug!(id = %story.id, items, "Saved story");
    }
}

/// Subset of application config consumed by the monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub username: String,
    pub paths: MonitorPaths,
    pub story_policy: StoryPolicy,
    pub skip_auxiliary: bool,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub timestamp: String,
    pub profile_id: ProfileIdCheck,
    pub new_highlights: usize,
    pub stories_processed: usize,
    pub snapshots: usize,
    /// Differences to the previous snapshot; `None` on the first run.
    pub follower_changes: Option<FollowerChanges>,
}

pub struct Monitor {
    config: MonitorConfig,
    store: LocalStore,
    provider: Arc<dyn Provider>,
    observer: Arc<dyn RunObserver>,
    span: tracing::Span,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new(config: MonitorConfig, provider: Arc<dyn Provider>) -> Self {
        let store = LocalStore::new(config.username.clone(), config.paths.clone());
        let span = tracing::info_span!("monitor", profile = %config.username);
        Self {
            config,
            store,
            provider,
            observer: Arc::new(TracingObserver),
            span,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Run once, keyed by the current local time.
    pub async fn run(&self) -> Result<RunSummary, MonitorError> {
        let timestamp = format_timestamp(&Local::now());
        self.run_at(&timestamp).await
    }

    /// Run once, keying every write of the run under `timestamp`.
    pub async fn run_at(&self, timestamp: &str) -> Result<RunSummary, MonitorError> {
        let mut phase = RunPhase::Idle;
        self.observer.phase_changed(phase);

        let result = self
            .execute(timestamp, &mut phase)
            .instrument(self.span.clone())
            .await;

        match result {
            Ok(summary) => {
                self.enter(&mut phase, RunPhase::Done);
                Ok(summary)
            }
            Err(source) => {
                let failed_in = phase;
                self.span.in_scope(|| {
                    tracing::error!("Error monitoring profile while {}: {:#}", failed_in, source);
                });
                self.enter(&mut phase, RunPhase::Failed);
                Err(MonitorError {
                    profile: self.config.username.clone(),
                    phase: failed_in,
                    source,
                })
            }
        }
    }

    fn enter(&self, phase: &mut RunPhase, next: RunPhase) {
        *phase = next;
        self.observer.phase_changed(next);
    }

    async fn execute(&self, timestamp: &str, phase: &mut RunPhase) -> anyhow::Result<RunSummary> {
        let username = &self.config.username;

        self.enter(phase, RunPhase::Initializing);
        self.store.ensure_layout().await?;
        let mut state = self.store.load().await?;
        let profile = self
            .provider
            .profile(username)
            .await
            .with_context(|| format!("Failed to resolve profile {}", username))?;
        let profile_id = self.reconcile_profile_id(&mut state, &profile).await?;
        tracing::info!(timestamp, "Starting run");

        self.enter(phase, RunPhase::ReconcilingHighlights);
        let new_highlights = self
            .reconcile_highlights(&mut state, &profile, timestamp)
            .await?;

        self.enter(phase, RunPhase::ReconcilingStories);
        let stories_processed = self
            .reconcile_stories(&mut state, &profile, timestamp)
            .await?;

        self.enter(phase, RunPhase::SnapshottingProfile);
        let snapshot = build_snapshot(self.provider.as_ref(), &profile).await?;
        let changes = state
            .snapshots
            .last()
            .map(|(_, previous)| follower_changes(previous, &snapshot));
        // Snapshots are append-only.
        if state.snapshots.contains_key(timestamp) {
            tracing::warn!(timestamp, "A snapshot already exists for this timestamp, keeping it");
        } else {
            state.snapshots.insert(timestamp.to_string(), snapshot);
        }
        self.store.save(&state).await?;

        self.enter(phase, RunPhase::PersistingAuxiliary);
        if self.config.skip_auxiliary {
            tracing::debug!("Skipping profile picture and tagged posts");
        } else if let Err(e) = self
            .provider
            .download_profile_extras(username, &self.config.paths.base_dir)
            .await
        {
            // Earlier phases are already on disk; nothing to undo.
            tracing::warn!("Failed to download profile picture or tagged posts: {:#}", e);
        }

        Ok(RunSummary {
            timestamp: timestamp.to_string(),
            profile_id,
            new_highlights,
            stories_processed,
            snapshots: state.snapshots.len(),
            follower_changes: changes,
        })
    }

    /// Compare the cached profile id with the provider's and overwrite the
    /// cache when they differ. A mismatch is expected after account
    /// migrations and is never treated as an error.
    async fn reconcile_profile_id(
        &self,
        state: &mut State,
        profile: &Profile,
    ) -> anyhow::Result<ProfileIdCheck> {
        let cached = state.profile.as_ref().map(|p| p.profile_id);
        let check = reconcile_profile_id(cached, profile.id);
        match check {
            ProfileIdCheck::Missing { current } => {
                tracing::info!(profile_id = current, "Profile ID file not found, saving");
            }
            ProfileIdCheck::Changed { previous, current } => {
                tracing::info!(
                    previous,
                    current,
                    "Profile ID has changed, updating profile ID file"
                );
            }
            ProfileIdCheck::Unchanged { .. } => {
                tracing::info!("Profile ID is up-to-date");
            }
        }

        if check.needs_write() {
            self.store.save_profile_id(check.current()).await?;
        }
        state.profile = Some(ProfileState {
            username: self.config.username.clone(),
            profile_id: check.current(),
        });
        Ok(check)
    }

    async fn reconcile_highlights(
        &self,
        state: &mut State,
        profile: &Profile,
        timestamp: &str,
    ) -> anyhow::Result<usize> {
        let available = self
            .provider
            .highlights(profile.id)
            .await
            .context("Failed to list highlights")?;

        let current_ids: Vec<String> = available.iter().map(|h| h.id.clone()).collect();
        compare_and_log(state.highlights.as_slice(), &current_ids, "highlights");

        let delta = new_items(&state.highlights, available);
        if delta.is_empty() {
            tracing::info!("No new highlights");
        }

        let mut saved = 0;
        for highlight in delta {
            tracing::info!(
                "Downloading new highlight: {} with {} highlight members",
                highlight.title,
                highlight.item_count
            );
            let items = self
                .provider
                .highlight_items(&highlight)
                .await
                .with_context(|| format!("Failed to list items of highlight {}", highlight.id))?;
            let metas = self
                .download_items(&items, &self.config.paths.highlights_dir, false)
                .await?;
            let count = metas.len();

            let entry = keyed_entry(&highlight.id, &highlight_metadata(&highlight, metas))?;
            self.store
                .update_metadata_log(Category::Highlights, entry, timestamp)
                .await?;
            state.highlights.insert(highlight.id.clone());
            self.store.save(state).await?;
            self.observer.highlight_saved(&highlight, count);
            saved += 1;
        }
        Ok(saved)
    }

    async fn reconcile_stories(
        &self,
        state: &mut State,
        profile: &Profile,
        timestamp: &str,
    ) -> anyhow::Result<usize> {
        let active = self
            .provider
            .stories(profile.id)
            .await
            .context("Failed to list stories")?;

        let work = match self.config.story_policy {
            StoryPolicy::Always => active,
            StoryPolicy::NewOnly => new_items(&state.stories, active),
        };

        let mut saved = 0;
        for story in work {
            tracing::info!(
                "Downloading story with the last created story at: {}",
                format_timestamp(&story.latest_media)
            );
            let items = self
                .provider
                .story_items(&story)
                .await
                .with_context(|| format!("Failed to list items of story {}", story.id))?;
            let metas = self
                .download_items(&items, &self.config.paths.stories_dir, true)
                .await?;
            let count = metas.len();

            let entry = keyed_entry(&story.id, &story_metadata(&story, metas))?;
            self.store
                .update_metadata_log(Category::Stories, entry, timestamp)
                .await?;
            state.stories.insert(story.id.clone());
            self.store.save(state).await?;
            self.observer.story_saved(&story, count);
            saved += 1;
        }
        Ok(saved)
    }

    /// Download each item in order and collect its metadata.
    async fn download_items(
        &self,
        items: &[StoryItem],
        target_dir: &std::path::Path,
        with_window: bool,
    ) -> anyhow::Result<Vec<ItemMetadata>> {
        let mut metas = Vec::with_capacity(items.len());
        for item in items {
            self.provider
                .download_item(item, target_dir)
                .await
                .with_context(|| format!("Failed to download media {}", item.media_id))?;
            metas.push(item_metadata(item, with_window));
        }
        Ok(metas)
    }
}
