use std::path::{Path, PathBuf};

/// Every on-disk location used for one monitored profile.
///
/// ```text
/// {root}/{username}_data/
///     {username}_profile_id.json
///     data.json
///     metadata.json
///     highlights/downloaded_highlights.json
///     stories/downloaded_stories.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPaths {
    pub base_dir: PathBuf,
    pub highlights_dir: PathBuf,
    pub stories_dir: PathBuf,
    pub profile_id_file: PathBuf,
    pub data_file: PathBuf,
    pub highlights_file: PathBuf,
    pub stories_file: PathBuf,
    pub metadata_file: PathBuf,
}

impl MonitorPaths {
    pub fn new(output_root: &Path, username: &str) -> Self {
        let base_dir = output_root.join(format!("{}_data", username));
        let highlights_dir = base_dir.join("highlights");
        let stories_dir = base_dir.join("stories");
        Self {
            profile_id_file: base_dir.join(format!("{}_profile_id.json", username)),
            data_file: base_dir.join("data.json"),
            highlights_file: highlights_dir.join("downloaded_highlights.json"),
            stories_file: stories_dir.join("downloaded_stories.json"),
            metadata_file: base_dir.join("metadata.json"),
            highlights_dir,
            stories_dir,
            base_dir,
        }
    }

    /// Directories that must exist before any file is written.
    pub fn directories(&self) -> [&Path; 3] {
        [&self.base_dir, &self.highlights_dir, &self.stories_dir]
    }
}
