use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the remote platform or writing fetched media.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Invalid provider URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Provider URL {0} cannot carry path segments")]
    NotABase(String),

    #[error("Disk error at {path}: {source}")]
    Disk {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ProviderError {
    pub(crate) fn disk(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Disk {
            path: path.into(),
            source,
        }
    }
}
