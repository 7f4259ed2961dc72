use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{Scheduler, TimerId};

/// State of a scheduled invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting for its deadline
    Scheduled,
    /// The invocation ran (or started running)
    Fired,
    /// The invocation was cancelled before its deadline
    Cancelled,
}

const SCHEDULED: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// A deferred invocation waiting on the scheduler
///
/// The only transitions are `Scheduled -> Fired` and `Scheduled -> Cancelled`.
/// Both go through a single compare-and-swap, so when firing and cancelling
/// race exactly one of them wins.
pub struct PendingTimer {
    state: AtomicU8,
    due: Duration,
}

impl PendingTimer {
    pub(crate) fn new(due: Duration) -> Self {
        Self {
            state: AtomicU8::new(SCHEDULED),
            due,
        }
    }

    /// The logical deadline of the timer, relative to the scheduler epoch
    pub fn due(&self) -> Duration {
        self.due
    }

    pub fn state(&self) -> TimerState {
        match self.state.load(Ordering::SeqCst) {
            SCHEDULED => TimerState::Scheduled,
            FIRED => TimerState::Fired,
            _ => TimerState::Cancelled,
        }
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(SCHEDULED, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Mark the timer as fired. Returns false if it is no longer scheduled.
    pub(crate) fn try_fire(&self) -> bool {
        self.transition(FIRED)
    }

    /// Mark the timer as cancelled. Returns false if it is no longer scheduled.
    pub(crate) fn try_cancel(&self) -> bool {
        self.transition(CANCELLED)
    }
}

impl fmt::Debug for PendingTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTimer")
            .field("state", &self.state())
            .field("due", &self.due)
            .finish()
    }
}

/// Control over a single deferred invocation
///
/// Returned by [`Delay::call`](crate::Delay::call) and used internally by
/// the other timing wrappers. Dropping the handle does not cancel the invocation.
#[derive(Clone)]
pub struct CancelHandle {
    id: TimerId,
    timer: Arc<PendingTimer>,
    scheduler: Arc<dyn Scheduler>,
}

impl CancelHandle {
    pub(crate) fn new(
        id: TimerId,
        timer: Arc<PendingTimer>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            id,
            timer,
            scheduler,
        }
    }

    /// Prevent the invocation from running
    ///
    /// This has no effect if the invocation already ran or was already
    /// cancelled, so it is safe to call any number of times.
    pub fn cancel(&self) {
        if self.timer.try_cancel() {
            debug!(id = %self.id, "timer cancelled");
            self.scheduler.cancel(self.id);
        }
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == TimerState::Scheduled
    }

    pub fn due(&self) -> Duration {
        self.timer.due()
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &self.id)
            .field("timer", &self.timer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_only_leaves_the_scheduled_state_once() {
        let timer = PendingTimer::new(Duration::from_millis(10));
        assert_eq!(timer.state(), TimerState::Scheduled);

        assert!(timer.try_fire());
        assert_eq!(timer.state(), TimerState::Fired);
        assert!(!timer.try_cancel());
        assert!(!timer.try_fire());
        assert_eq!(timer.state(), TimerState::Fired);

        let timer = PendingTimer::new(Duration::ZERO);
        assert!(timer.try_cancel());
        assert!(!timer.try_fire());
        assert_eq!(timer.state(), TimerState::Cancelled);
    }
}
