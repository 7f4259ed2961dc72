use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{sleep_until, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, span, warn, Instrument, Level};

use super::{Job, Scheduler, TimerId};
use crate::errors::InvocationError;
use crate::sync::Lock;

struct Inner {
    handle: Handle,
    epoch: Instant,
    next_id: AtomicU64,
    tasks: Lock<HashMap<u64, AbortHandle>>,
    errors: mpsc::UnboundedSender<InvocationError>,
}

/// A scheduler running jobs as tasks on the tokio runtime
///
/// Each job is spawned as a task that sleeps for the requested delay and then
/// runs the job. Cancelling a job aborts its task. On a current thread runtime
/// this gives the single-threaded cooperative model: jobs only run when the
/// code driving the runtime yields.
///
/// Errors returned by jobs are logged and sent to the [`Errors`] stream
/// returned by [`TokioScheduler::new`].
///
/// ```rust
/// use std::time::Duration;
/// use decorate::{debounce, TokioScheduler};
/// use tokio_stream::StreamExt;
///
/// # tokio_test::block_on(async {
/// let (scheduler, mut errors) = TokioScheduler::new();
/// let save = debounce(&scheduler, |doc: &'static str| {
///     anyhow::ensure!(!doc.is_empty(), "empty document");
///     Ok(())
/// }, 10)
/// .unwrap();
///
/// save.call(("",));
/// let err = errors.next().await.unwrap();
/// assert_eq!(err.to_string(), "empty document");
/// # })
/// ```
#[derive(Clone)]
pub struct TokioScheduler {
    inner: Arc<Inner>,
}

impl TokioScheduler {
    /// Create a scheduler on the current tokio runtime
    ///
    /// # Panics
    ///
    /// This function panics if called outside of a tokio runtime.
    pub fn new() -> (Self, Errors) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                handle: Handle::current(),
                epoch: Instant::now(),
                next_id: AtomicU64::new(0),
                tasks: Lock::new(HashMap::new()),
                errors: tx,
            }),
        };
        (scheduler, Errors(UnboundedReceiverStream::new(rx)))
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inner.epoch)
    }

    fn schedule(&self, after: Duration, job: Job) -> TimerId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = deadline(after);
        let inner = Arc::clone(&self.inner);

        // hold the lock until the abort handle is stored so a job that
        // finishes right away cannot try to remove itself first
        let mut tasks = self.inner.tasks.lock();
        let task = self.inner.handle.spawn(
            async move {
                sleep_until(deadline).await;
                inner.tasks.lock().remove(&id);
                match job() {
                    Ok(()) => debug!("timer fired"),
                    Err(err) => {
                        warn!("deferred invocation failed: {err}");
                        // nobody is listening, the warning is all we can do
                        let _ = inner.errors.send(err);
                    }
                }
            }
            .instrument(span!(Level::DEBUG, "fire_timer", id = %TimerId(id), after = ?after)),
        );
        tasks.insert(id, task.abort_handle());

        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        if let Some(task) = self.inner.tasks.lock().remove(&id.0) {
            task.abort();
        }
    }
}

// Roughly 30 years from now, same as tokio uses for unbounded sleeps
fn deadline(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after)
        .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30))
}

/// Stream of errors returned by jobs of a [`TokioScheduler`]
///
/// The stream ends once every clone of the scheduler has been dropped and all
/// reported errors have been read.
pub struct Errors(UnboundedReceiverStream<InvocationError>);

impl Stream for Errors {
    type Item = InvocationError;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.0).poll_next(cx)
    }
}
