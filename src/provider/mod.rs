//! Capability set the monitor needs from the remote platform.
//!
//! Authentication, rate limiting and retries belong to whatever sits behind
//! an implementation of [`Provider`]; the monitor only sequences calls and
//! records what comes back.

pub mod error;
pub mod http;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

use crate::store::Identity;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use types::{Highlight, Profile, Story, StoryItem};

#[async_trait]
pub trait Provider: Send + Sync {
    /// Resolve a profile by username.
    async fn profile(&self, username: &str) -> anyhow::Result<Profile>;

    /// Every account following `profile`. Fully materialised, no paging
    /// state is kept between calls.
    async fn followers(&self, profile: &Profile) -> anyhow::Result<Vec<Identity>>;

    /// Every account `profile` follows.
    async fn followees(&self, profile: &Profile) -> anyhow::Result<Vec<Identity>>;

    async fn highlights(&self, profile_id: u64) -> anyhow::Result<Vec<Highlight>>;

    async fn highlight_items(&self, highlight: &Highlight) -> anyhow::Result<Vec<StoryItem>>;

    /// Stories that are currently active for the profile.
    async fn stories(&self, profile_id: u64) -> anyhow::Result<Vec<Story>>;

    async fn story_items(&self, story: &Story) -> anyhow::Result<Vec<StoryItem>>;

    /// Store the media of `item` inside `target_dir`.
    async fn download_item(&self, item: &StoryItem, target_dir: &Path) -> anyhow::Result<()>;

    /// Store the profile picture and tagged posts of `username` inside
    /// `target_dir`.
    async fn download_profile_extras(&self, username: &str, target_dir: &Path)
        -> anyhow::Result<()>;
}
