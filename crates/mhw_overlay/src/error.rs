//! Error types for conflict analysis and deployment.
//!
//! Only whole-operation failures are errors. A single mod or file that cannot
//! be processed is reported inside the operation's result instead.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (reading staging trees, writing the manifest, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize the deployment manifest.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The deployment target does not exist or is not a directory.
    #[error("Game directory not found: {0}")]
    GameRootMissing(Utf8PathBuf),

    /// Walking a staging directory failed.
    #[error("Failed to read staging directory {path}: {message}")]
    StagingUnreadable { path: Utf8PathBuf, message: String },

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
