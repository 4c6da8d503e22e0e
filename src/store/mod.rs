//! Local persistence for a monitored profile.
//!
//! All state lives in pretty-printed JSON files under a per-profile
//! directory (see [`MonitorPaths`]). Files are rewritten in full on every
//! save; the in-memory structures are cumulative, so each write is a
//! snapshot of everything seen so far.

pub mod error;
pub mod local;
pub mod paths;
pub mod types;

pub use error::StoreError;
pub use local::LocalStore;
pub use paths::MonitorPaths;
pub use types::{
    format_timestamp, Category, DownloadedIds, HighlightMetadata, Identity, ItemMetadata,
    MetadataLog, ProfileSnapshot, ProfileState, SnapshotStore, State, StoryMetadata,
};
