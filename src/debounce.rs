use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::errors::InvalidTarget;
use crate::sync::Lock;
use crate::target::{IntoResult, IntoTarget, Invocation, Outcome, Target};
use crate::timer::{schedule_invocation, share, CancelHandle, Scheduler};

/// Coalesce a burst of calls into a single call
///
/// Each call replaces the pending one, if any, and restarts the quiet period.
/// The target only runs once no call has been made for the whole quiet period,
/// with the receiver and arguments of the last call. A call made exactly when
/// the quiet period ends does not prevent the previous call from running.
///
/// There is at most one invocation waiting for its quiet period per wrapper.
/// Clones share it.
pub struct Debounce<C, A> {
    target: Target<C, A, Outcome>,
    quiet: Duration,
    scheduler: Arc<dyn Scheduler>,
    pending: Arc<Lock<Option<CancelHandle>>>,
}

impl<C, A> Clone for Debounce<C, A> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            quiet: self.quiet,
            scheduler: Arc::clone(&self.scheduler),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<C, A> fmt::Debug for Debounce<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("quiet", &self.quiet)
            .field("pending", &*self.pending.lock())
            .finish()
    }
}

/// Wrap a function so it only runs after `quiet_ms` milliseconds without calls
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use decorate::{debounce, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let search = debounce(
///     &scheduler,
///     move |q: &'static str| log.lock().unwrap().push(q),
///     100,
/// )
/// .unwrap();
///
/// search.call(("r",));
/// scheduler.advance(Duration::from_millis(50)).unwrap();
/// search.call(("ru",));
/// scheduler.advance(Duration::from_millis(50)).unwrap();
/// search.call(("rust",));
/// scheduler.advance(Duration::from_millis(100)).unwrap();
///
/// assert_eq!(*seen.lock().unwrap(), vec!["rust"]);
/// ```
pub fn debounce<S, T, A, M>(
    scheduler: &S,
    target: T,
    quiet_ms: u64,
) -> Result<Debounce<(), A>, InvalidTarget>
where
    S: Scheduler + Clone,
    T: IntoTarget<(), A, M>,
    T::Output: IntoResult + 'static,
    A: 'static,
{
    Debounce::new(scheduler, target, Duration::from_millis(quiet_ms))
}

impl<C: 'static, A: 'static> Debounce<C, A> {
    /// Create a debounce wrapper for a target that may take a receiver
    pub fn new<S, T, M>(scheduler: &S, target: T, quiet: Duration) -> Result<Self, InvalidTarget>
    where
        S: Scheduler + Clone,
        T: IntoTarget<C, A, M>,
        T::Output: IntoResult + 'static,
    {
        let target = target.into_target()?.map(IntoResult::into_result);
        Ok(Self {
            target,
            quiet,
            scheduler: share(scheduler),
            pending: Arc::new(Lock::new(None)),
        })
    }
}

impl<C, A> Debounce<C, A>
where
    C: Send + 'static,
    A: Send + 'static,
{
    /// Schedule the target to run on `receiver` with `args`, superseding any
    /// pending call
    pub fn call_on(&self, receiver: C, args: A) {
        let invocation = Invocation::new(self.target.clone(), receiver, args);

        // the pending slot stays locked while swapping timers, so two calls
        // can never leave two timers behind
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            // a call at the deadline is too late to supersede the previous one
            if previous.due() > self.scheduler.now() {
                if previous.is_pending() {
                    trace!(id = %previous.id(), "superseding pending call");
                }
                previous.cancel();
            }
        }
        *pending = Some(schedule_invocation(
            &self.scheduler,
            self.quiet,
            invocation,
        ));
    }

    /// Cancel the pending call, if any, without scheduling a new one
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.cancel();
        }
    }

    /// Returns true if a call is waiting for the quiet period to end
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(CancelHandle::is_pending)
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }
}

impl<A: Send + 'static> Debounce<(), A> {
    /// Schedule the target to run with `args`, superseding any pending call
    pub fn call(&self, args: A) {
        self.call_on((), args)
    }
}
