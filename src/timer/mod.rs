//! Cooperative timers
//!
//! Deferred wrappers never spawn threads or block. They hand a [`Job`] to a
//! [`Scheduler`], which runs it once its delay elapses, on whatever execution
//! context drives the scheduler. Two schedulers are provided:
//!
//! - [`ManualScheduler`], a virtual clock that only moves when told to. Useful for
//!   tests and for embedding the wrappers in an existing event loop.
//! - [`TokioScheduler`], backed by the tokio timer of the current runtime.
//!
//! Failures of deferred jobs cannot reach the original caller, who has already
//! returned, so each scheduler reports them through its own error channel.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

mod manual;
mod pending;
mod runtime;

pub use manual::ManualScheduler;
pub use pending::{CancelHandle, PendingTimer, TimerState};
pub use runtime::{Errors, TokioScheduler};

use crate::target::{Invocation, Outcome};

/// A unit of deferred work
pub type Job = Box<dyn FnOnce() -> Outcome + Send>;

/// Identifier of a scheduled job, unique per scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cooperative timer queue
pub trait Scheduler: Send + Sync + 'static {
    /// Time elapsed since the scheduler was created
    fn now(&self) -> Duration;

    /// Queue a job to run after the given delay
    ///
    /// Implementations must return without running the job, even if the delay
    /// is zero. Jobs with the same deadline run in the order they were scheduled.
    fn schedule(&self, after: Duration, job: Job) -> TimerId;

    /// Remove a queued job. Unknown or already finished jobs are ignored.
    fn cancel(&self, id: TimerId);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn schedule(&self, after: Duration, job: Job) -> TimerId {
        (**self).schedule(after, job)
    }

    fn cancel(&self, id: TimerId) {
        (**self).cancel(id)
    }
}

pub(crate) fn share<S: Scheduler + Clone>(scheduler: &S) -> Arc<dyn Scheduler> {
    Arc::new(scheduler.clone())
}

/// Schedule a job guarded by a [`PendingTimer`]
///
/// The job only runs if the timer is still scheduled when its deadline arrives.
pub(crate) fn schedule_job<F>(
    scheduler: &Arc<dyn Scheduler>,
    after: Duration,
    job: F,
) -> CancelHandle
where
    F: FnOnce() -> Outcome + Send + 'static,
{
    let timer = Arc::new(PendingTimer::new(scheduler.now().saturating_add(after)));
    let guard = Arc::clone(&timer);
    let id = scheduler.schedule(
        after,
        Box::new(move || {
            if !guard.try_fire() {
                return Ok(());
            }
            job()
        }),
    );
    debug!(id = %id, due = ?timer.due(), "timer scheduled");
    CancelHandle::new(id, timer, Arc::clone(scheduler))
}

/// Schedule a captured invocation
pub(crate) fn schedule_invocation<C, A>(
    scheduler: &Arc<dyn Scheduler>,
    after: Duration,
    invocation: Invocation<C, A, Outcome>,
) -> CancelHandle
where
    C: Send + 'static,
    A: Send + 'static,
{
    schedule_job(scheduler, after, move || invocation.invoke())
}
