use std::num::{NonZeroU8, NonZeroUsize};
use std::path::{Path, PathBuf};

use crate::Error;

const APP_DIR: &str = "MyGeoEye";
const DEFAULT_SUFFIX: &str = "satellite.png";
const DEFAULT_MAX_CONCURRENT: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};
const DEFAULT_WORKERS: NonZeroU8 = match NonZeroU8::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

/// Executor configuration.
///
/// ```
/// # use geoeye_dl::Config;
/// let config = Config::default()
///     .with_base_dir("/tmp/images")
///     .with_max_concurrent(3.try_into().unwrap());
///
/// assert_eq!(config.max_concurrent().get(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory where images are stored.
    base_dir: PathBuf,
    /// Concurrency bound of a batch when the caller does not provide one.
    max_concurrent: NonZeroUsize,
    /// Number of workers of the executor's pool, i.e. the upper bound of any batch concurrency.
    workers: NonZeroU8,
    /// Trailing part of every file name.
    suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            workers: DEFAULT_WORKERS,
            suffix: DEFAULT_SUFFIX.to_owned(),
        }
    }
}

impl Config {
    #[inline]
    pub fn with_base_dir(self, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..self
        }
    }

    #[inline]
    pub fn with_max_concurrent(self, max_concurrent: NonZeroUsize) -> Self {
        Self { max_concurrent, ..self }
    }

    #[inline]
    pub fn with_workers(self, workers: NonZeroU8) -> Self {
        Self { workers, ..self }
    }

    #[inline]
    pub fn with_suffix(self, suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..self
        }
    }

    #[inline]
    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_path()
    }

    #[inline]
    pub fn max_concurrent(&self) -> NonZeroUsize {
        self.max_concurrent
    }

    #[inline]
    pub fn workers(&self) -> NonZeroU8 {
        self.workers
    }

    #[inline]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Create the base directory and its parents if missing.
    pub fn ensure_base_dir(&self) -> Result<(), Error> {
        tracing::debug!("Ensure download directory exists: `{}`", self.base_dir.display());

        std::fs::create_dir_all(&self.base_dir).map_err(|err| Error::bootstrap(&self.base_dir, &err))
    }
}

/// `<Downloads>/MyGeoEye`, falling back on `<home>/Downloads` then on a relative `Downloads`.
fn default_base_dir() -> PathBuf {
    let downloads = directories::UserDirs::new()
        .map(|dirs| match dirs.download_dir() {
            Some(dir) => dir.to_path_buf(),
            None => dirs.home_dir().join("Downloads"),
        })
        .unwrap_or_else(|| PathBuf::from("Downloads"));

    downloads.join(APP_DIR)
}
