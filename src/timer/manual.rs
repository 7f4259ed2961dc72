use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, span, warn, Level};

use super::{Job, Scheduler, TimerId};
use crate::errors::{AggregateError, InvocationError};
use crate::sync::Lock;

#[derive(Default)]
struct Queue {
    now: Duration,
    next_id: u64,
    // ordered by deadline, then by scheduling order
    jobs: BTreeMap<(Duration, u64), Job>,
    deadlines: HashMap<u64, Duration>,
}

impl Queue {
    /// Remove the earliest job due at or before `until`, moving the clock to its deadline
    fn pop_due(&mut self, until: Duration) -> Option<(TimerId, Job)> {
        let (&(due, id), _) = self.jobs.first_key_value()?;
        if due > until {
            return None;
        }
        let job = self.jobs.remove(&(due, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(due);
        Some((TimerId(id), job))
    }
}

/// A scheduler driven by a virtual clock
///
/// Time only moves forward when [`advance`](Self::advance) or
/// [`run_until_idle`](Self::run_until_idle) are called, and jobs run on the
/// calling thread. Clones share the same clock and queue.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use decorate::{delay, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let delayed = delay(
///     &scheduler,
///     move |msg: &'static str| log.lock().unwrap().push(msg),
///     50,
/// )
/// .unwrap();
///
/// delayed.call(("hello",));
/// scheduler.advance(Duration::from_millis(49)).unwrap();
/// assert!(seen.lock().unwrap().is_empty());
///
/// scheduler.advance(Duration::from_millis(1)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
/// ```
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Lock<Queue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().jobs.len()
    }

    /// Deadline of the next job, if any
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue
            .lock()
            .jobs
            .first_key_value()
            .map(|(&(due, _), _)| due)
    }

    /// Move the clock forward, running every job that becomes due
    ///
    /// Jobs run in deadline order. While a job runs, [`now`](Scheduler::now)
    /// reports its deadline, and jobs it schedules are also run if they fall
    /// within the window. A failing job does not prevent the rest from running;
    /// all failures are returned together once the clock has reached its new
    /// position.
    ///
    /// Returns the number of jobs that ran.
    pub fn advance(&self, by: Duration) -> Result<usize, AggregateError<InvocationError>> {
        let until = self.now().saturating_add(by);
        let res = self.run_until(until);
        let mut queue = self.queue.lock();
        queue.now = queue.now.max(until);
        res
    }

    /// Run jobs until the queue is empty, moving the clock to the last deadline
    pub fn run_until_idle(&self) -> Result<usize, AggregateError<InvocationError>> {
        self.run_until(Duration::MAX)
    }

    fn run_until(&self, until: Duration) -> Result<usize, AggregateError<InvocationError>> {
        let mut fired = 0;
        let mut errors = Vec::new();
        loop {
            // release the lock before running the job, it may schedule more work
            let next = self.queue.lock().pop_due(until);
            let Some((id, job)) = next else {
                break;
            };

            let _span = span!(Level::DEBUG, "fire_timer", id = %id, due = ?self.now()).entered();
            fired += 1;
            match job() {
                Ok(()) => debug!("timer fired"),
                Err(err) => {
                    warn!("deferred invocation failed: {err}");
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            Ok(fired)
        } else {
            Err(AggregateError(errors))
        }
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.queue.lock().now
    }

    fn schedule(&self, after: Duration, job: Job) -> TimerId {
        let mut queue = self.queue.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        let due = queue.now.saturating_add(after);
        queue.jobs.insert((due, id), job);
        queue.deadlines.insert(id, due);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) {
        let mut queue = self.queue.lock();
        if let Some(due) = queue.deadlines.remove(&id.0) {
            queue.jobs.remove(&(due, id.0));
        }
    }
}
