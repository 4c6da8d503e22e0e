//! Error types for the local store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing the profile's JSON files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An existing file is not valid JSON for the expected structure.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serializing an in-memory structure failed.
    #[error("Failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A file exists but does not have the shape the store expects.
    #[error("Unexpected layout in {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
