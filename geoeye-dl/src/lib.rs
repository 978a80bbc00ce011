//! A simple crate downloading satellite images to the local storage.
//!
//! Its core is a bounded-concurrency batch executor: a batch of `(id, payload)` items is fanned out to a worker pool,
//! at most `k` payloads are being written at the same time, and exactly one [`DownloadResult`] per item is fanned back
//! in, whether the item succeeded or failed. Every attempt is also appended to an in-memory [`History`] that can be
//! summarized into [`Stats`] at any time.
//!
//! The executor relies on two collaborators:
//! - a [`Namer`] resolving the destination path of an image, by default a [`TimestampNamer`] producing
//!   `{base_dir}/{id}_{YYYYMMDD_HHMMSS}_satellite.png`;
//! - a [`Sink`] persisting the payload at this path, by default a [`FileSink`] writing brand new local files.
//!
//! The [`task::Pool`] of workers is started once along with the [`Executor`] and reused by every batch, while each batch
//! gates task launches with its own `Semaphore` to enforce its concurrency bound. The history is the only shared
//! mutable state, guarded by a `RwLock` so that appends are serialized.
//!
//! As a **strong hypothesis**, payloads are already fully available in memory: there is no network transfer, no retry
//! and no cancellation, a launched download always runs to completion.
//!
//! ```text
//!     - base dir (defaults to ~/Downloads/MyGeoEye)
//!       L {id}_{YYYYMMDD_HHMMSS}_satellite.png
//!       L {id}_{YYYYMMDD_HHMMSS}_{n}_satellite.png   (same id downloaded again within the same second)
//! ```

mod config;
mod error;
mod executor;
mod history;
mod item;
mod naming;
mod sink;
mod stats;

pub use config::Config;
pub use error::Error;
pub use executor::Executor;
pub use history::History;
pub use item::{DownloadItem, DownloadResult, Outcome, Status};
pub use naming::{Namer, TimestampNamer};
pub use sink::{FileSink, Sink};
pub use stats::{Metrics, Stats};

pub use bytes::Bytes;

pub mod task;
