use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Local};

use crate::Error;

/// An image to be persisted: an id and its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    /// Image id, embedded in the destination file name.
    pub id: String,
    /// Raw image bytes, possibly empty.
    pub payload: Bytes,
}

impl DownloadItem {
    /// Create a new `DownloadItem`.
    pub fn new(id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// Terminal status of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failed,
}

/// What happened to a download.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The payload has been fully written to `path`.
    Success { path: PathBuf, elapsed: Duration },
    /// The payload could not be written.
    Failure { error: Error },
}

/// The record of one download attempt.
///
/// Exactly one `DownloadResult` is produced per attempted item, whatever its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    /// Id of the downloaded item.
    pub id: String,
    /// Wall-clock time at which the attempt completed.
    pub timestamp: DateTime<Local>,
    pub outcome: Outcome,
}

impl DownloadResult {
    pub(crate) fn success(id: impl Into<String>, path: PathBuf, elapsed: Duration) -> Self {
        Self {
            id: id.into(),
            timestamp: Local::now(),
            outcome: Outcome::Success { path, elapsed },
        }
    }

    pub(crate) fn failure(id: impl Into<String>, error: Error) -> Self {
        Self {
            id: id.into(),
            timestamp: Local::now(),
            outcome: Outcome::Failure { error },
        }
    }

    #[inline]
    pub fn status(&self) -> Status {
        match self.outcome {
            Outcome::Success { .. } => Status::Success,
            Outcome::Failure { .. } => Status::Failed,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    /// Destination of a successful download.
    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            Outcome::Success { path, .. } => Some(path),
            Outcome::Failure { .. } => None,
        }
    }

    /// Time spent writing a successful download.
    pub fn elapsed(&self) -> Option<Duration> {
        match self.outcome {
            Outcome::Success { elapsed, .. } => Some(elapsed),
            Outcome::Failure { .. } => None,
        }
    }

    /// Error of a failed download.
    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(error),
        }
    }

    /// Rendered error message of a failed download.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessors() {
        let ok = DownloadResult::success("img-1", PathBuf::from("a/img-1.png"), Duration::from_millis(1_500));

        assert_eq!(ok.status(), Status::Success);
        assert_eq!(ok.path(), Some(Path::new("a/img-1.png")));
        assert_eq!(ok.elapsed(), Some(Duration::from_millis(1_500)));
        assert_eq!(ok.error_message(), None);

        let failed = DownloadResult::failure(
            "img-2",
            Error::InvalidInput {
                field: "id",
                reason: "must not be empty",
            },
        );

        assert!(!failed.is_success());
        assert_eq!(failed.path(), None);
        assert_eq!(failed.elapsed(), None);
        assert_eq!(failed.error_message().as_deref(), Some("invalid id: must not be empty"));
    }
}
