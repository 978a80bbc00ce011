use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while downloading images.
///
/// Every variant carries owned, cloneable context so that a failure can be kept in the
/// download history and still be rendered later on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The byte sink could not persist a payload.
    #[error("failed to write `{}`: {reason}", path.display())]
    WriteFailure {
        path: PathBuf,
        kind: io::ErrorKind,
        reason: String,
    },
    /// A caller-provided value was rejected before any I/O happened.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: &'static str },
    /// The download directory could not be created.
    #[error("failed to create download directory `{}`: {reason}", path.display())]
    Bootstrap {
        path: PathBuf,
        kind: io::ErrorKind,
        reason: String,
    },
    /// A collaborator panicked while a download task was running.
    #[error("download task panicked: {reason}")]
    Panicked { reason: String },
    /// The worker pool no longer accepts tasks.
    #[error("worker pool is closed")]
    PoolClosed,
    /// The executor was created outside of a tokio runtime.
    #[error("no tokio runtime available: {reason}")]
    NoRuntime { reason: String },
}

impl Error {
    pub(crate) fn write(path: &Path, err: &io::Error) -> Self {
        Self::WriteFailure {
            path: path.to_path_buf(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn bootstrap(path: &Path, err: &io::Error) -> Self {
        Self::Bootstrap {
            path: path.to_path_buf(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }

    /// Build an error out of a panic payload, as caught by [`std::panic::catch_unwind`].
    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let reason = match (payload.downcast_ref::<&str>(), payload.downcast_ref::<String>()) {
            (Some(msg), _) => (*msg).to_owned(),
            (None, Some(msg)) => msg.clone(),
            (None, None) => "unknown panic payload".to_owned(),
        };

        Self::Panicked { reason }
    }
}
