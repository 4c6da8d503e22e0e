//! Types for the local store.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Format used for every timestamp written by the monitor: run keys,
/// story expiry windows and item creation times.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a datetime with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Cached identity of the monitored profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileState {
    pub username: String,
    pub profile_id: u64,
}

/// On-disk shape of `{username}_profile_id.json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ProfileIdFile {
    pub profile_id: u64,
}

/// A follower or followee, serialized as a two-element `[id, username]` array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u64, String)", into = "(u64, String)")]
pub struct Identity {
    pub id: u64,
    pub username: String,
}

impl From<(u64, String)> for Identity {
    fn from((id, username): (u64, String)) -> Self {
        Self { id, username }
    }
}

impl From<Identity> for (u64, String) {
    fn from(identity: Identity) -> Self {
        (identity.id, identity.username)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.id)
    }
}

/// One timestamped record of a profile's public attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub followers_count: u64,
    pub following_count: u64,
    pub bio: String,
    pub profile_pic_url: String,
    pub followers: Vec<Identity>,
    pub following: Vec<Identity>,
}

/// Cumulative snapshot history keyed by run timestamp, in insertion order.
pub type SnapshotStore = IndexMap<String, ProfileSnapshot>;

/// Ordered set of identifiers that have already been processed.
///
/// Order is discovery order. Inserting an id that is already present is a
/// no-op, so the persisted list never carries duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadedIds {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl DownloadedIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Append `id` if it has not been seen. Returns whether it was added.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.seen.contains(&id) {
            return false;
        }
        self.seen.insert(id.clone());
        self.order.push(id);
        true
    }

    /// Append every unseen id, returning how many were added.
    pub fn extend<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for id in ids {
            if self.insert(id) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }
}

impl<S: Into<String>> FromIterator<S> for DownloadedIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = Self::new();
        ids.extend(iter);
        ids
    }
}

impl Serialize for DownloadedIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.order)
    }
}

impl<'de> Deserialize<'de> for DownloadedIds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        // Files written by older tooling hold `{}` when nothing was ever
        // recorded, and numeric highlight ids.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawIds {
            List(Vec<RawId>),
            Object(Map<String, Value>),
        }

        match RawIds::deserialize(deserializer)? {
            RawIds::List(ids) => Ok(ids
                .into_iter()
                .map(|raw| match raw {
                    RawId::Text(s) => s,
                    RawId::Number(n) => n.to_string(),
                })
                .collect()),
            RawIds::Object(map) if map.is_empty() => Ok(Self::new()),
            RawIds::Object(_) => Err(serde::de::Error::custom(
                "expected a list of ids, found a non-empty object",
            )),
        }
    }
}

/// Top-level sections of the metadata log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Highlights,
    Stories,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Highlights, Category::Stories];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highlights => "highlights",
            Self::Stories => "stories",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive attributes of a single downloaded story item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub media_id: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub caption: Option<String>,
    pub caption_mentions: Vec<String>,
    pub is_video: bool,
    pub video_url: Option<String>,
}

/// Metadata log entry for one highlight reel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMetadata {
    pub id: String,
    pub title: String,
    pub cover_url: String,
    pub highlight_count: u32,
    pub stories: Vec<ItemMetadata>,
}

/// Metadata log entry for one active story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMetadata {
    pub id: String,
    pub last_seen: Option<String>,
    pub latest_media: String,
    pub story_count: u32,
    pub stories: Vec<ItemMetadata>,
}

/// The two-level `category -> timestamp -> object` metadata log.
///
/// Kept as raw JSON objects so that merging is a key-level union and keys
/// written by other tools survive a rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataLog(Map<String, Value>);

impl Default for MetadataLog {
    fn default() -> Self {
        Self::skeleton()
    }
}

impl MetadataLog {
    /// `{"highlights": {}, "stories": {}}`
    pub fn skeleton() -> Self {
        let mut root = Map::new();
        for category in Category::ALL {
            root.insert(category.as_str().to_string(), Value::Object(Map::new()));
        }
        Self(root)
    }

    /// Merge `entry` into `category/timestamp`, creating either level when
    /// missing. Existing keys in the timestamp object are overwritten by keys
    /// in `entry`; other keys are kept.
    pub fn merge(
        &mut self,
        category: Category,
        timestamp: &str,
        entry: Map<String, Value>,
    ) -> Result<(), String> {
        let section = self
            .0
            .entry(category.as_str())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| format!("'{}' is not an object", category))?;

        let slot = section
            .entry(timestamp)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| format!("'{}/{}' is not an object", category, timestamp))?;

        for (key, value) in entry {
            slot.insert(key, value);
        }
        Ok(())
    }

    /// The object stored under `category/timestamp`, if any.
    pub fn entry(&self, category: Category, timestamp: &str) -> Option<&Map<String, Value>> {
        self.0
            .get(category.as_str())?
            .as_object()?
            .get(timestamp)?
            .as_object()
    }

    /// Timestamps recorded under `category`, oldest first.
    pub fn timestamps(&self, category: Category) -> Vec<&str> {
        self.0
            .get(category.as_str())
            .and_then(Value::as_object)
            .map(|section| section.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Everything the store loads at the start of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub profile: Option<ProfileState>,
    pub snapshots: SnapshotStore,
    pub highlights: DownloadedIds,
    pub stories: DownloadedIds,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_downloaded_ids_insert_dedups() {
        let mut ids = DownloadedIds::new();
        assert!(ids.insert("h1"));
        assert!(ids.insert("h2"));
        assert!(!ids.insert("h1"));
        assert_eq!(ids.as_slice(), &["h1".to_string(), "h2".to_string()]);
    }

    #[test]
    fn test_downloaded_ids_extend_counts_new_only() {
        let mut ids: DownloadedIds = ["a", "b"].into_iter().collect();
        let added = ids.extend(["b", "c", "c", "d"]);
        assert_eq!(added, 2);
        assert_eq!(ids.as_slice(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_downloaded_ids_accepts_numeric_and_empty_object() {
        let ids: DownloadedIds = serde_json::from_value(json!([17, "abc", 17])).unwrap();
        assert_eq!(ids.as_slice(), ["17", "abc"]);

        let empty: DownloadedIds = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());

        assert!(serde_json::from_value::<DownloadedIds>(json!({"x": 1})).is_err());
    }

    #[test]
    fn test_downloaded_ids_serializes_as_list() {
        let ids: DownloadedIds = ["x", "y"].into_iter().collect();
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!(["x", "y"]));
    }

    #[test]
    fn test_identity_is_a_pair() {
        let identity = Identity {
            id: 42,
            username: "alice".to_string(),
        };
        assert_eq!(serde_json::to_value(&identity).unwrap(), json!([42, "alice"]));
        let back: Identity = serde_json::from_value(json!([42, "alice"])).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn test_item_metadata_omits_absent_window() {
        let item = ItemMetadata {
            media_id: 9,
            url: "https://cdn.example/9.jpg".to_string(),
            created_at: None,
            expires_at: None,
            caption: None,
            caption_mentions: vec![],
            is_video: false,
            video_url: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("created_at").is_none());
        assert!(value.get("expires_at").is_none());
        assert_eq!(value["video_url"], Value::Null);
    }

    #[test]
    fn test_metadata_log_skeleton() {
        assert_eq!(
            serde_json::to_value(MetadataLog::skeleton()).unwrap(),
            json!({"highlights": {}, "stories": {}})
        );
    }

    #[test]
    fn test_metadata_log_merge_unions_keys() {
        let mut log = MetadataLog::skeleton();
        let ts = "2025-01-15 10:00:00";

        let first = json!({"a": 1, "shared": "old"}).as_object().unwrap().clone();
        let second = json!({"b": 2, "shared": "new"}).as_object().unwrap().clone();
        log.merge(Category::Highlights, ts, first).unwrap();
        log.merge(Category::Highlights, ts, second).unwrap();

        let entry = log.entry(Category::Highlights, ts).unwrap();
        assert_eq!(entry.get("a"), Some(&json!(1)));
        assert_eq!(entry.get("b"), Some(&json!(2)));
        assert_eq!(entry.get("shared"), Some(&json!("new")));
        assert!(log.entry(Category::Stories, ts).is_none());
    }

    #[test]
    fn test_metadata_log_merge_recreates_missing_category() {
        let mut log: MetadataLog = serde_json::from_value(json!({})).unwrap();
        let entry = json!({"k": true}).as_object().unwrap().clone();
        log.merge(Category::Stories, "t1", entry).unwrap();
        assert_eq!(log.timestamps(Category::Stories), vec!["t1"]);
    }

    #[test]
    fn test_metadata_log_merge_rejects_non_object_section() {
        let mut log: MetadataLog =
            serde_json::from_value(json!({"highlights": [], "stories": {}})).unwrap();
        let err = log
            .merge(Category::Highlights, "t1", Map::new())
            .unwrap_err();
        assert!(err.contains("highlights"));
    }

    #[test]
    fn test_format_timestamp() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap()
            .and_utc();
        assert_eq!(format_timestamp(&dt), "2025-03-04 05:06:07");
    }
}
