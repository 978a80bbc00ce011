use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Local;
use futures::future::FutureExt;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::task::Pool;
use crate::{Config, DownloadItem, DownloadResult, Error, FileSink, History, Namer, Outcome, Sink, Stats, TimestampNamer};

/// Batch download executor.
///
/// Persists images through a [`Sink`] at the paths resolved by a [`Namer`], and records every
/// attempt in an in-memory [`History`] living as long as the executor.
///
/// Batches run on a worker pool created along with the executor and shared by all batches.
///
/// ```no_run
/// # tokio_test::block_on(async {
/// # use geoeye_dl::{Config, DownloadItem, Executor};
/// let executor = Executor::new(Config::default()).unwrap();
///
/// let items = vec![DownloadItem::new("a", vec![1u8, 2, 3]), DownloadItem::new("b", vec![4u8, 5])];
/// let results = executor.batch_download(items, Some(2)).await.unwrap();
///
/// for result in &results {
///     println!("{}: {:?}", result.id, result.status());
/// }
///
/// println!("{:?}", executor.stats());
/// # })
/// ```
#[derive(Debug)]
pub struct Executor<S = FileSink, N = TimestampNamer> {
    shared: Arc<Shared<S, N>>,
    pool: Pool,
}

/// Executor state reachable from the pool's tasks.
#[derive(Debug)]
struct Shared<S, N> {
    config: Config,
    sink: S,
    namer: N,
    history: History,
}

impl Executor {
    /// Create an executor storing files under `config.base_dir()`, with the default naming convention.
    ///
    /// The base directory is created if missing.
    ///
    /// # Errors
    /// - [`Error::NoRuntime`] if not called from within a tokio runtime,
    /// - [`Error::Bootstrap`] if the base directory cannot be created.
    pub fn new(config: Config) -> Result<Self, Error> {
        let namer = TimestampNamer::new(config.base_dir(), config.suffix());

        Self::with_collaborators(config, FileSink, namer)
    }
}

impl<S, N> Executor<S, N>
where
    S: Sink + 'static,
    N: Namer + 'static,
{
    /// Create an executor persisting payloads with `sink` at the paths resolved by `namer`.
    ///
    /// The base directory is created if missing. See [`Executor::new()`] for errors.
    pub fn with_collaborators(config: Config, sink: S, namer: N) -> Result<Self, Error> {
        tokio::runtime::Handle::try_current().map_err(|err| Error::NoRuntime { reason: err.to_string() })?;

        config.ensure_base_dir()?;

        let mut pool = Pool::default();
        pool.start(config.workers());

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                sink,
                namer,
                history: History::default(),
            }),
            pool,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Download a single image on the current task.
    ///
    /// The attempt is recorded in the history whatever its outcome.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `id` is empty,
    /// - [`Error::WriteFailure`] if the payload could not be persisted.
    pub async fn single_download(&self, id: impl Into<String>, payload: impl Into<Bytes>) -> Result<DownloadResult, Error> {
        let result = self.shared.download(DownloadItem::new(id, payload)).await;

        match result.outcome {
            Outcome::Success { .. } => Ok(result),
            Outcome::Failure { error } => Err(error),
        }
    }

    /// Download a batch of images, running at most `max_concurrent` of them at the same time.
    ///
    /// `max_concurrent` defaults to [`Config::max_concurrent()`]. The actual concurrency is also bounded by the pool
    /// size, see [`Config::workers()`].
    ///
    /// Exactly one result is returned per item, in completion order. A failing item is returned as a failed result
    /// and never interrupts the other ones.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `max_concurrent` is zero,
    /// - [`Error::PoolClosed`] if the worker pool does not accept tasks anymore.
    pub async fn batch_download(
        &self,
        items: impl IntoIterator<Item = DownloadItem>,
        max_concurrent: Option<usize>,
    ) -> Result<Vec<DownloadResult>, Error> {
        let max_concurrent = max_concurrent.unwrap_or(self.shared.config.max_concurrent().get());

        if max_concurrent == 0 {
            return Err(Error::InvalidInput {
                field: "max_concurrent",
                reason: "must be at least 1",
            });
        }

        let items: Vec<_> = items.into_iter().collect();

        if items.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Scheduling {} downloads, at most {max_concurrent} at a time", items.len());

        let permits = Arc::new(Semaphore::new(max_concurrent));
        let mut pending = FuturesUnordered::new();
        let mut results = Vec::with_capacity(items.len());

        for item in items {
            // wait for a slot while collecting completed downloads so that results keep flowing in arrival order
            let permit = loop {
                tokio::select! {
                    biased;
                    permit = Arc::clone(&permits).acquire_owned() => break permit.map_err(|_| Error::PoolClosed)?,
                    Some(result) = pending.next(), if !pending.is_empty() => results.push(result),
                }
            };

            let id = item.id.clone();
            let lost_id = item.id.clone();
            let shared = Arc::clone(&self.shared);

            // the task records its own outcome, it completes even when this batch is dropped
            let handle = self.pool.execute(async move {
                let _permit = permit;

                match AssertUnwindSafe(shared.download(item)).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => shared.record_failure(id, Error::panicked(payload.as_ref())),
                }
            })?;

            pending.push(handle.map(move |result| result.unwrap_or_else(|err| self.shared.record_failure(lost_id, err))));
        }

        results.extend(pending.collect::<Vec<_>>().await);

        Ok(results)
    }

    /// A snapshot of every recorded attempt, in completion order.
    #[inline]
    pub fn history(&self) -> Vec<DownloadResult> {
        self.shared.history.snapshot()
    }

    /// Forget every recorded attempt.
    pub fn clear_history(&self) {
        self.shared.history.clear();

        tracing::info!("Download history cleared");
    }

    /// Summarize the recorded attempts.
    #[inline]
    pub fn stats(&self) -> Stats {
        self.shared.history.stats()
    }

    /// Stop the worker pool, waiting for pending downloads to complete.
    pub async fn shutdown(mut self) {
        self.pool.stop().await
    }
}

impl<S: Sink, N: Namer> Shared<S, N> {
    /// Download `item` and record the attempt in the history.
    async fn download(&self, item: DownloadItem) -> DownloadResult {
        let DownloadItem { id, payload } = item;

        let result = if id.is_empty() {
            DownloadResult::failure(
                id,
                Error::InvalidInput {
                    field: "id",
                    reason: "must not be empty",
                },
            )
        } else {
            let start = Instant::now();
            let path = self.namer.destination(&id, Local::now());

            tracing::debug!("Downloading image `{id}` to local storage: `{}`", path.display());

            match self.sink.write(&path, &payload).await {
                Ok(()) => DownloadResult::success(id, path, start.elapsed()),
                Err(err) => DownloadResult::failure(id, Error::write(&path, &err)),
            }
        };

        self.record(result)
    }

    fn record_failure(&self, id: String, error: Error) -> DownloadResult {
        self.record(DownloadResult::failure(id, error))
    }

    /// Log the outcome of an attempt and append it to the history.
    fn record(&self, result: DownloadResult) -> DownloadResult {
        match &result.outcome {
            Outcome::Success { elapsed, .. } => {
                tracing::info!("Download `{}`: execution time = {:.4} seconds", result.id, elapsed.as_secs_f64());
            }
            Outcome::Failure { error } => {
                tracing::warn!("Download `{}` failed: {error}", result.id);
            }
        }

        self.history.push(result.clone());

        result
    }
}
