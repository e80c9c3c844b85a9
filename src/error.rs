//! Error kinds shared by every helper in this crate.
//!
//! Nothing here is retried: release creation and asset upload are not
//! idempotent, so each variant is surfaced to the invoker as soon as it occurs.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    /// A path that must exist is missing or has the wrong type, or a copy/move failed.
    #[error("file system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A descriptor or configuration file could not be opened.
    #[error("cannot open {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Non-success HTTP response, transport failure, or a missing local asset.
    #[error("release API error: {message}")]
    ReleaseApi { message: String },

    /// The external build or version-control tool could not report a state.
    #[error("state check failed: {message}")]
    StateCheck { message: String },

    /// Remote or branch information was not in the expected format.
    #[error("could not parse {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// The settings file exists but is not valid.
    #[error("invalid settings in {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },
}

impl ReleaseError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ReleaseError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn api(message: impl Into<String>) -> Self {
        ReleaseError::ReleaseApi {
            message: message.into(),
        }
    }

    pub(crate) fn state(message: impl Into<String>) -> Self {
        ReleaseError::StateCheck {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReleaseError>;
