//! JSON-file implementation of the profile store.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tokio::fs;

use super::paths::MonitorPaths;
use super::types::{Category, MetadataLog, ProfileIdFile, ProfileState, State};
use super::StoreError;

/// Owns every persisted structure of a single monitored profile.
///
/// Each write replaces the whole file. Content is written to a sibling
/// `.tmp` file first and renamed over the target, so readers never observe
/// a half-written document. There is no cross-process locking; one writer
/// per profile directory is assumed.
#[derive(Debug, Clone)]
pub struct LocalStore {
    username: String,
    paths: MonitorPaths,
}

impl LocalStore {
    pub fn new(username: impl Into<String>, paths: MonitorPaths) -> Self {
        Self {
            username: username.into(),
            paths,
        }
    }

    pub fn paths(&self) -> &MonitorPaths {
        &self.paths
    }

    /// Create the profile's directory tree and seed `metadata.json` with an
    /// empty skeleton. Safe to call on every run: existing files are never
    /// touched.
    pub async fn ensure_layout(&self) -> Result<(), StoreError> {
        for dir in self.paths.directories() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        let metadata_file = &self.paths.metadata_file;
        let exists = fs::try_exists(metadata_file)
            .await
            .map_err(|e| StoreError::io(metadata_file, e))?;
        if !exists {
            tracing::debug!("Creating {}", metadata_file.display());
            write_json(metadata_file, &MetadataLog::skeleton()).await?;
        }
        Ok(())
    }

    /// Read all run state. Missing files load as empty defaults; files that
    /// exist but fail to parse are reported as [`StoreError::Parse`].
    pub async fn load(&self) -> Result<State, StoreError> {
        let profile = self
            .load_profile_id()
            .await?
            .map(|profile_id| ProfileState {
                username: self.username.clone(),
                profile_id,
            });

        let state = State {
            profile,
            snapshots: read_json_or_default(&self.paths.data_file).await?,
            highlights: read_json_or_default(&self.paths.highlights_file).await?,
            stories: read_json_or_default(&self.paths.stories_file).await?,
        };

        tracing::debug!(
            snapshots = state.snapshots.len(),
            highlights = state.highlights.len(),
            stories = state.stories.len(),
            "Loaded state for {}",
            self.username
        );
        Ok(state)
    }

    /// Rewrite every structure from the cumulative in-memory state.
    pub async fn save(&self, state: &State) -> Result<(), StoreError> {
        write_json(&self.paths.data_file, &state.snapshots).await?;
        write_json(&self.paths.highlights_file, &state.highlights).await?;
        write_json(&self.paths.stories_file, &state.stories).await?;
        if let Some(profile) = &state.profile {
            self.save_profile_id(profile.profile_id).await?;
        }
        Ok(())
    }

    /// The cached numeric profile id, or `None` when no id file exists.
    pub async fn load_profile_id(&self) -> Result<Option<u64>, StoreError> {
        let file: Option<ProfileIdFile> = read_json(&self.paths.profile_id_file).await?;
        Ok(file.map(|f| f.profile_id))
    }

    pub async fn save_profile_id(&self, profile_id: u64) -> Result<(), StoreError> {
        write_json(&self.paths.profile_id_file, &ProfileIdFile { profile_id }).await
    }

    pub async fn load_metadata_log(&self) -> Result<MetadataLog, StoreError> {
        read_json_or_default(&self.paths.metadata_file).await
    }

    /// Merge `entry` into `category/timestamp` of the metadata log and
    /// rewrite the file. Keys already present under that timestamp are
    /// overwritten by keys in `entry`; all others are kept.
    pub async fn update_metadata_log(
        &self,
        category: Category,
        entry: Map<String, Value>,
        timestamp: &str,
    ) -> Result<(), StoreError> {
        let path = &self.paths.metadata_file;
        let mut log = self.load_metadata_log().await?;
        log.merge(category, timestamp, entry)
            .map_err(|reason| StoreError::InvalidLayout {
                path: path.clone(),
                reason,
            })?;
        write_json(path, &log).await
    }
}

/// Read and parse `path`, returning `None` when the file does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::parse(path, e))
}

async fn read_json_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StoreError> {
    Ok(read_json(path).await?.unwrap_or_default())
}

/// Serialize with 4-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = to_pretty_json(value)?;
    let tmp = temp_path(path);
    fs::write(&tmp, &bytes)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
