//! Conversion of provider objects into metadata log entries.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::provider::{Highlight, Story, StoryItem};
use crate::store::{format_timestamp, HighlightMetadata, ItemMetadata, StoryMetadata};

/// Descriptive attributes of `item`. Story items carry their creation and
/// expiry times; highlight items do not.
pub fn item_metadata(item: &StoryItem, with_window: bool) -> ItemMetadata {
    ItemMetadata {
        media_id: item.media_id,
        url: item.url.clone(),
        created_at: with_window
            .then(|| item.created_at.as_ref().map(format_timestamp))
            .flatten(),
        expires_at: with_window
            .then(|| item.expires_at.as_ref().map(format_timestamp))
            .flatten(),
        caption: item.caption.clone(),
        caption_mentions: item.caption_mentions.clone(),
        is_video: item.is_video,
        video_url: if item.is_video {
            item.video_url.clone()
        } else {
            None
        },
    }
}

pub fn highlight_metadata(highlight: &Highlight, items: Vec<ItemMetadata>) -> HighlightMetadata {
    HighlightMetadata {
        id: highlight.id.clone(),
        title: highlight.title.clone(),
        cover_url: highlight.cover_url.clone(),
        highlight_count: highlight.item_count,
        stories: items,
    }
}

pub fn story_metadata(story: &Story, items: Vec<ItemMetadata>) -> StoryMetadata {
    StoryMetadata {
        id: story.id.clone(),
        last_seen: story.last_seen.as_ref().map(format_timestamp),
        latest_media: format_timestamp(&story.latest_media),
        story_count: story.item_count,
        stories: items,
    }
}

/// Wrap `entry` as `{id: entry}` so that several entries written under the
/// same run timestamp sit side by side instead of overwriting each other.
pub fn keyed_entry<T: Serialize>(id: &str, entry: &T) -> serde_json::Result<Map<String, Value>> {
    let mut map = Map::new();
    map.insert(id.to_string(), serde_json::to_value(entry)?);
    Ok(map)
}
