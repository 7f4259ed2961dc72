use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::errors::InvalidTarget;
use crate::sync::Lock;
use crate::target::{IntoResult, IntoTarget, Outcome, Target};
use crate::timer::{schedule_job, share, CancelHandle, Scheduler};

struct State<C, A> {
    cooldown: Option<CancelHandle>,
    // bumped for every cooldown, so a stale timer can tell it was replaced
    generation: u64,
    saved: Option<(C, A)>,
}

struct Shared<C, A> {
    target: Target<C, A, Outcome>,
    interval: Duration,
    scheduler: Arc<dyn Scheduler>,
    state: Lock<State<C, A>>,
}

impl<C, A> Shared<C, A>
where
    C: Send + 'static,
    A: Send + 'static,
{
    fn start_cooldown(self: &Arc<Self>, state: &mut State<C, A>) {
        state.generation += 1;
        let generation = state.generation;
        let shared = Arc::clone(self);
        let cooldown = schedule_job(&self.scheduler, self.interval, move || {
            shared.end_cooldown(generation)
        });
        state.cooldown = Some(cooldown);
    }

    fn end_cooldown(self: Arc<Self>, generation: u64) -> Outcome {
        let (receiver, args) = {
            let mut state = self.state.lock();
            if state.generation != generation || state.cooldown.is_none() {
                trace!("cooldown was replaced, nothing to do");
                return Ok(());
            }
            match state.saved.take() {
                Some(call) => {
                    // the saved call starts a new cooldown of its own
                    self.start_cooldown(&mut state);
                    call
                }
                None => {
                    state.cooldown = None;
                    return Ok(());
                }
            }
        };

        trace!("running saved call");
        self.target.call(&receiver, args)
    }
}

/// Run at most one call per interval
///
/// A call made while the wrapper is idle runs immediately and starts a
/// cooldown. Calls made during the cooldown are not run right away; only the
/// last of them is kept, and it runs when the cooldown ends, starting a new
/// cooldown. When a cooldown ends with no saved call the wrapper becomes idle
/// again.
///
/// Errors of immediate calls are returned to the caller, errors of saved calls
/// are reported by the scheduler.
pub struct Throttle<C, A> {
    shared: Arc<Shared<C, A>>,
}

impl<C, A> Clone for Throttle<C, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C, A> fmt::Debug for Throttle<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Throttle")
            .field("interval", &self.shared.interval)
            .field("cooldown", &state.cooldown)
            .field("saved", &state.saved.is_some())
            .finish()
    }
}

/// Wrap a function so it runs at most once every `interval_ms` milliseconds
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use decorate::{throttle, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let moved = throttle(&scheduler, move |x: u32| log.lock().unwrap().push(x), 100).unwrap();
///
/// moved.call((1,)).unwrap();
/// moved.call((2,)).unwrap();
/// moved.call((3,)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
///
/// scheduler.advance(Duration::from_millis(100)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
/// ```
pub fn throttle<S, T, A, M>(
    scheduler: &S,
    target: T,
    interval_ms: u64,
) -> Result<Throttle<(), A>, InvalidTarget>
where
    S: Scheduler + Clone,
    T: IntoTarget<(), A, M>,
    T::Output: IntoResult + 'static,
    A: 'static,
{
    Throttle::new(scheduler, target, Duration::from_millis(interval_ms))
}

impl<C: 'static, A: 'static> Throttle<C, A> {
    /// Create a throttle wrapper for a target that may take a receiver
    pub fn new<S, T, M>(scheduler: &S, target: T, interval: Duration) -> Result<Self, InvalidTarget>
    where
        S: Scheduler + Clone,
        T: IntoTarget<C, A, M>,
        T::Output: IntoResult + 'static,
    {
        let target = target.into_target()?.map(IntoResult::into_result);
        Ok(Self {
            shared: Arc::new(Shared {
                target,
                interval,
                scheduler: share(scheduler),
                state: Lock::new(State {
                    cooldown: None,
                    generation: 0,
                    saved: None,
                }),
            }),
        })
    }
}

impl<C, A> Throttle<C, A>
where
    C: Send + 'static,
    A: Send + 'static,
{
    /// Call the target on `receiver` with `args`, or save the call for the end
    /// of the cooldown
    pub fn call_on(&self, receiver: C, args: A) -> Outcome {
        {
            let mut state = self.shared.state.lock();
            if state.cooldown.is_some() {
                trace!("cooling down, call saved");
                state.saved = Some((receiver, args));
                return Ok(());
            }
            self.shared.start_cooldown(&mut state);
        }

        self.shared.target.call(&receiver, args)
    }

    /// Drop the saved call, if any, and end the cooldown
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.saved = None;
        if let Some(cooldown) = state.cooldown.take() {
            cooldown.cancel();
        }
    }

    /// Returns true if calls are currently being held back
    pub fn is_cooling(&self) -> bool {
        self.shared.state.lock().cooldown.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }
}

impl<A: Send + 'static> Throttle<(), A> {
    /// Call the target with `args`, or save the call for the end of the cooldown
    pub fn call(&self, args: A) -> Outcome {
        self.call_on((), args)
    }
}
