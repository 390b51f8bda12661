use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Overlay(#[from] mhw_overlay::Error),

    #[error("Archive not found: {0}")]
    ArchiveNotFound(Utf8PathBuf),

    #[error("Not a valid archive: {0}")]
    NotAnArchive(Utf8PathBuf),

    #[error("Source directory not found: {0}")]
    SourceNotFound(Utf8PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    #[error("Archive contains no files under '{root}': {path}")]
    EmptyInstall { path: Utf8PathBuf, root: String },

    #[error("Mod not found: {0}")]
    ModNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Another deploy or undeploy is already running (lock held on {0})")]
    Busy(Utf8PathBuf),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
