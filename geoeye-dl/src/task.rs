//! This module provides the worker pool running download tasks.

use std::num::NonZeroU8;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, Future, FutureExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::Instrument;

use crate::Error;

type Task = future::BoxFuture<'static, ()>;

/// A fixed-size pool of asynchronous workers pulling tasks from a shared queue.
///
/// The pool is meant to be started once and reused: tasks are queued without bound and processed
/// by the next available worker, so at most `size` tasks make progress at the same time.
///
/// # Forget tasks
/// Tasks can just be pushed and forgotten using [`Pool::forget()`] method (tasks must return `()`).
///
/// # Keep track of tasks
/// Tasks can alternatively be pushed while keeping a [`TaskHandle`] on their result using
/// [`Pool::execute()`] method (tasks can return any `T: Send`).
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// # use geoeye_dl::task::Pool;
/// let mut pool = Pool::default();
/// pool.start(3.try_into().unwrap());
///
/// for i in 0..=5 {
///     pool.forget(async move { println!("Hello from task #{i}!") }).unwrap();
/// }
///
/// pool.close().await;
/// # })
/// ```
#[derive(Debug, Default)]
pub struct Pool {
    /// The pool of workers.
    workers: Vec<Worker>,
    /// The sending part of a channel to push tasks to the workers.
    ///
    /// The next available worker will wait for a task to be received through the channel.
    sender: Option<mpsc::UnboundedSender<Task>>,
}

impl Pool {
    /// Start a pool with `size` workers.
    ///
    /// Must be called from within a tokio runtime. Workers run in the span current at this call.
    ///
    /// # Panics
    /// This method panics if the pool is already running, ie. when called more than once without stopping the pool in between.
    pub fn start(&mut self, size: NonZeroU8) {
        assert!(self.sender.is_none() && self.workers.is_empty());

        let (sender, receiver) = mpsc::unbounded_channel();

        let receiver = Arc::new(Mutex::new(receiver));

        static WORKER_ID: AtomicUsize = AtomicUsize::new(0);
        let size = size.get().into();
        let id = WORKER_ID.fetch_add(size, Ordering::Relaxed);

        self.workers = (0..size).map(|i| Worker::new(id.wrapping_add(i), Arc::clone(&receiver))).collect();
        self.sender = Some(sender);
    }

    /// Number of running workers.
    #[inline]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Send a task and keep a handle on its result.
    ///
    /// The task always runs to completion: dropping the handle only discards its result.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// # use geoeye_dl::task::Pool;
    /// # let mut pool = Pool::default();
    /// # pool.start(3.try_into().unwrap());
    /// let handle = pool.execute(async { "Hello world!" }).unwrap();
    ///
    /// assert_eq!(handle.await, Ok("Hello world!"));
    /// # })
    /// ```
    pub fn execute<T: Send + 'static>(&self, future: impl Future<Output = T> + Send + 'static) -> Result<TaskHandle<T>, Error> {
        let (sender, receiver) = oneshot::channel();

        self.forget(async move {
            let output = AssertUnwindSafe(future).catch_unwind().await;

            // the handle may be gone already, the result is then just discarded
            let _ = sender.send(output.map_err(|payload| Error::panicked(payload.as_ref())));
        })?;

        Ok(TaskHandle { receiver })
    }

    /// Send a task and forget it.
    ///
    /// A panicking task is reported and does not take its worker down.
    ///
    /// # Errors
    /// [`Error::PoolClosed`] if the pool is not running.
    pub fn forget(&self, future: impl Future<Output = ()> + Send + 'static) -> Result<(), Error> {
        let sender = self.sender.as_ref().ok_or(Error::PoolClosed)?;

        let task = AssertUnwindSafe(future).catch_unwind().map(|result| {
            if let Err(payload) = result {
                tracing::warn!("Task panicked: {}", Error::panicked(payload.as_ref()));
            }
        });

        sender.send(task.boxed()).map_err(|_| Error::PoolClosed)
    }

    /// Stop current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once stopped, the pool can be started again with any number of workers.
    pub async fn stop(&mut self) {
        self.sender.take();
        let workers = std::mem::take(&mut self.workers);

        future::join_all(workers.into_iter().inspect(|worker| {
            tracing::debug!("Stopping worker {}...", worker.id);
        }))
        .await;
    }

    /// Close current pool of workers, waiting for all pending tasks to complete.
    ///
    /// Once closed, the pool cannot be used since it is consumed.
    pub async fn close(mut self) {
        self.stop().await
    }
}

/// Handle on the result of a task sent with [`Pool::execute()`].
///
/// Resolves to [`Error::Panicked`] if the task panicked, or to [`Error::PoolClosed`] if the pool dropped the task
/// without running it. Unlike a [`future::RemoteHandle`], dropping it does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T, Error>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, Error>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|output| output.unwrap_or(Err(Error::PoolClosed)))
    }
}

#[derive(Debug)]
struct Worker {
    id: usize,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn new(id: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) -> Worker {
        tracing::debug!("Starting worker {id}...");

        Worker {
            id,
            handle: tokio::spawn(async move {
                loop {
                    let message = receiver.lock().await.recv().await;

                    match message {
                        Some(task) => {
                            tracing::trace!("Executing task on worker {id}...");

                            task.await;
                        }
                        None => {
                            tracing::debug!("All tasks exhausted, shutting down worker {id}.");
                            break;
                        }
                    }
                }
            }
            .in_current_span()),
        }
    }
}

impl Future for Worker {
    type Output = Result<(), tokio::task::JoinError>;

    #[inline]
    fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.handle.poll_unpin(cx)
    }
}
