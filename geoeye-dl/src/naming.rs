use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// How many seconds of issued names are remembered behind the most recent one.
const ISSUED_WINDOW: i64 = 2;

/// Destination path resolution.
pub trait Namer: Send + Sync {
    /// Return where the image `id`, downloaded at `at`, should be stored.
    ///
    /// Distinct ids must never resolve to the same path.
    fn destination(&self, id: &str, at: DateTime<Local>) -> PathBuf;
}

impl<F> Namer for F
where
    F: Fn(&str, DateTime<Local>) -> PathBuf + Send + Sync,
{
    #[inline]
    fn destination(&self, id: &str, at: DateTime<Local>) -> PathBuf {
        self(id, at)
    }
}

/// Default namer: `{base_dir}/{id}_{YYYYMMDD_HHMMSS}_{suffix}`.
///
/// The timestamp only has a one-second granularity, so the namer remembers the names it handed out
/// during the last few seconds. When the same id shows up again within a second, a counter is
/// inserted before the suffix (`{id}_{YYYYMMDD_HHMMSS}_{n}_{suffix}`) instead of reusing the path.
///
/// Calls may arrive slightly out of order around a second boundary, so names are remembered per
/// second and only forgotten once time has moved on.
#[derive(Debug)]
pub struct TimestampNamer {
    base_dir: PathBuf,
    suffix: String,
    issued: Mutex<Issued>,
}

/// Names issued recently, keyed by second and id, with how many times each was issued.
#[derive(Debug, Default)]
struct Issued {
    latest: i64,
    counts: HashMap<(i64, String), u32>,
}

impl TimestampNamer {
    pub fn new(base_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            suffix: suffix.into(),
            issued: Mutex::default(),
        }
    }

    #[inline]
    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_path()
    }
}

impl Namer for TimestampNamer {
    fn destination(&self, id: &str, at: DateTime<Local>) -> PathBuf {
        let stamp = at.format(TIMESTAMP_FORMAT).to_string();
        let second = at.timestamp();

        let repeat = {
            let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);

            if second > issued.latest {
                issued.latest = second;
                issued.counts.retain(|(issued_at, _), _| *issued_at + ISSUED_WINDOW >= second);
            }

            let count = issued.counts.entry((second, id.to_owned())).or_insert(0);
            let repeat = *count;
            *count += 1;
            repeat
        };

        let file_name = match repeat {
            0 => format!("{id}_{stamp}_{}", self.suffix),
            n => {
                tracing::trace!("Image `{id}` already named during {stamp}, using counter {n}");
                format!("{id}_{stamp}_{n}_{}", self.suffix)
            }
        };

        self.base_dir.join(file_name)
    }
}
