//! JSON-over-HTTP provider.
//!
//! Talks to a gateway exposing the platform as plain REST resources:
//!
//! ```text
//! GET {base}/profiles/{username}
//! GET {base}/profiles/{username}/tagged
//! GET {base}/users/{id}/followers
//! GET {base}/users/{id}/following
//! GET {base}/users/{id}/highlights
//! GET {base}/users/{id}/stories
//! GET {base}/highlights/{id}/items
//! GET {base}/stories/{id}/items
//! ```
//!
//! Session handling and throttling are the gateway's concern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::types::{Highlight, Profile, Story, StoryItem};
use super::{Provider, ProviderError};
use crate::store::Identity;

pub struct HttpProvider {
    client: Client,
    base: Url,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpProvider {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ProviderError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ProviderError::NotABase(base_url.to_string()));
        }
        Ok(Self { client, base })
    }

    /// Append `segments` to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ProviderError::NotABase(self.base.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ProviderError> {
        let url = self.endpoint(segments)?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// Stream `url` into `dest` via a `.part` file renamed on completion.
    /// Existing files are left alone.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<(), ProviderError> {
        if fs::try_exists(dest)
            .await
            .map_err(|e| ProviderError::disk(dest, e))?
        {
            tracing::debug!("{} already exists, skipping", dest.display());
            return Ok(());
        }
        self.stream_to_file(url, dest).await
    }

    /// Stream `url` into `dest`, replacing any existing file.
    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<(), ProviderError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ProviderError::disk(parent, e))?;
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let part_path = part_path(dest);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&part_path)
            .await
            .map_err(|e| ProviderError::disk(&part_path, e))?;

        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| ProviderError::disk(&part_path, e))?;
            bytes_written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| ProviderError::disk(&part_path, e))?;
        drop(file);

        fs::rename(&part_path, dest)
            .await
            .map_err(|e| ProviderError::disk(dest, e))?;
        tracing::debug!(bytes = bytes_written, "Saved {}", dest.display());
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Lower-cased extension of the last path segment of `url`, if it looks
/// like one.
fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

/// `{username}_profile_pic_{stem}.{ext}`, where `stem` is the last path
/// segment of the picture URL. `None` when that segment can't name a file.
pub(crate) fn profile_pic_file_name(username: &str, url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    let valid = !stem.is_empty()
        && stem.len() <= 128
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return None;
    }
    let ext = url_extension(url).unwrap_or_else(|| "jpg".to_string());
    Some(format!("{}_profile_pic_{}.{}", username, stem, ext))
}

/// `{media_id}.{ext}`, taking the extension from the media URL and falling
/// back to `mp4` / `jpg`.
pub(crate) fn media_file_name(item: &StoryItem) -> String {
    let fallback = if item.is_video { "mp4" } else { "jpg" };
    let ext = url_extension(item.media_url()).unwrap_or_else(|| fallback.to_string());
    format!("{}.{}", item.media_id, ext)
}

#[async_trait]
impl Provider for HttpProvider {
    async fn profile(&self, username: &str) -> anyhow::Result<Profile> {
        Ok(self.get_json(&["profiles", username]).await?)
    }

    async fn followers(&self, profile: &Profile) -> anyhow::Result<Vec<Identity>> {
        let id = profile.id.to_string();
        Ok(self.get_json(&["users", &id, "followers"]).await?)
    }

    async fn followees(&self, profile: &Profile) -> anyhow::Result<Vec<Identity>> {
        let id = profile.id.to_string();
        Ok(self.get_json(&["users", &id, "following"]).await?)
    }

    async fn highlights(&self, profile_id: u64) -> anyhow::Result<Vec<Highlight>> {
        let id = profile_id.to_string();
        Ok(self.get_json(&["users", &id, "highlights"]).await?)
    }

    async fn highlight_items(&self, highlight: &Highlight) -> anyhow::Result<Vec<StoryItem>> {
        Ok(self
            .get_json(&["highlights", &highlight.id, "items"])
            .await?)
    }

    async fn stories(&self, profile_id: u64) -> anyhow::Result<Vec<Story>> {
        let id = profile_id.to_string();
        Ok(self.get_json(&["users", &id, "stories"]).await?)
    }

    async fn story_items(&self, story: &Story) -> anyhow::Result<Vec<StoryItem>> {
        Ok(self.get_json(&["stories", &story.id, "items"]).await?)
    }

    async fn download_item(&self, item: &StoryItem, target_dir: &Path) -> anyhow::Result<()> {
        let dest = target_dir.join(media_file_name(item));
        Ok(self.fetch_to_file(item.media_url(), &dest).await?)
    }

    async fn download_profile_extras(
        &self,
        username: &str,
        target_dir: &Path,
    ) -> anyhow::Result<()> {
        let profile = self.profile(username).await?;
        let pic_url = &profile.profile_pic_url;
        if !pic_url.is_empty() {
            match profile_pic_file_name(username, pic_url) {
                // A new picture gets a new name, so existing files are kept.
                Some(name) => self.fetch_to_file(pic_url, &target_dir.join(name)).await?,
                None => {
                    let ext = url_extension(pic_url).unwrap_or_else(|| "jpg".to_string());
                    let dest = target_dir.join(format!("{}_profile_pic.{}", username, ext));
                    self.stream_to_file(pic_url, &dest).await?;
                }
            }
        }

        let tagged: Vec<StoryItem> = self.get_json(&["profiles", username, "tagged"]).await?;
        tracing::debug!(count = tagged.len(), "Fetching tagged posts");
        let tagged_dir = target_dir.join("tagged");
        for item in &tagged {
            self.download_item(item, &tagged_dir).await?;
        }
        Ok(())
    }
}
