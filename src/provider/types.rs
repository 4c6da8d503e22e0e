use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A resolved profile as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub username: String,
    pub followers: u64,
    pub followees: u64,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub profile_pic_url: String,
}

/// A highlight reel: a persistent collection of expired story items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Highlight {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover_url: String,
    pub item_count: u32,
}

/// The currently active story set of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Story {
    pub id: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub latest_media: DateTime<Utc>,
    pub item_count: u32,
}

/// A single photo or video inside a highlight or story.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryItem {
    pub media_id: u64,
    pub url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub caption_mentions: Vec<String>,
    #[serde(default)]
    pub is_video: bool,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl StoryItem {
    /// URL of the media that should be stored: the video stream for videos,
    /// the image otherwise.
    pub fn media_url(&self) -> &str {
        match (&self.video_url, self.is_video) {
            (Some(video), true) => video,
            _ => &self.url,
        }
    }
}
