use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::InvalidTarget;
use crate::target::{IntoResult, IntoTarget, Invocation, Outcome, Target};
use crate::timer::{schedule_invocation, share, CancelHandle, Scheduler};

/// Postpone every call by a fixed amount of time
///
/// Calls are independent of each other: calling the wrapper `N` times results
/// in `N` invocations of the target, each one with the receiver and arguments
/// of its own call. Nothing is coalesced.
pub struct Delay<C, A> {
    target: Target<C, A, Outcome>,
    delay: Duration,
    scheduler: Arc<dyn Scheduler>,
}

impl<C, A> Clone for Delay<C, A> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            delay: self.delay,
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<C, A> fmt::Debug for Delay<C, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay").field("delay", &self.delay).finish()
    }
}

/// Wrap a function so every call runs `delay_ms` milliseconds later
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
/// use decorate::{delay, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let delayed = delay(&scheduler, move |n: u32| log.lock().unwrap().push(n), 100).unwrap();
///
/// delayed.call((1,));
/// let second = delayed.call((2,));
/// second.cancel();
///
/// scheduler.advance(Duration::from_millis(100)).unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
pub fn delay<S, T, A, M>(
    scheduler: &S,
    target: T,
    delay_ms: u64,
) -> Result<Delay<(), A>, InvalidTarget>
where
    S: Scheduler + Clone,
    T: IntoTarget<(), A, M>,
    T::Output: IntoResult + 'static,
    A: 'static,
{
    Delay::new(scheduler, target, Duration::from_millis(delay_ms))
}

impl<C: 'static, A: 'static> Delay<C, A> {
    /// Create a delay wrapper for a target that may take a receiver
    pub fn new<S, T, M>(scheduler: &S, target: T, delay: Duration) -> Result<Self, InvalidTarget>
    where
        S: Scheduler + Clone,
        T: IntoTarget<C, A, M>,
        T::Output: IntoResult + 'static,
    {
        let target = target.into_target()?.map(IntoResult::into_result);
        Ok(Self {
            target,
            delay,
            scheduler: share(scheduler),
        })
    }
}

impl<C, A> Delay<C, A>
where
    C: Send + 'static,
    A: Send + 'static,
{
    /// Schedule the target to run on `receiver` with `args`
    ///
    /// Returns immediately. The returned handle can be used to cancel this
    /// particular invocation.
    pub fn call_on(&self, receiver: C, args: A) -> CancelHandle {
        let invocation = Invocation::new(self.target.clone(), receiver, args);
        schedule_invocation(&self.scheduler, self.delay, invocation)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<A: Send + 'static> Delay<(), A> {
    /// Schedule the target to run with `args`
    pub fn call(&self, args: A) -> CancelHandle {
        self.call_on((), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualScheduler, TimerState};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    type Log<T> = Arc<Mutex<Vec<(T, Duration)>>>;

    fn recording<T: Send + 'static>(
        scheduler: &ManualScheduler,
    ) -> (Log<T>, impl Fn(T) + Send + Sync + 'static) {
        let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
        let writer = log.clone();
        let clock = scheduler.clone();
        (log, move |value: T| {
            writer.lock().unwrap().push((value, clock.now()))
        })
    }

    #[test]
    fn it_runs_every_call_independently() {
        let scheduler = ManualScheduler::new();
        let (log, target) = recording::<&'static str>(&scheduler);
        let delayed = delay(&scheduler, target, 50).unwrap();

        let x = delayed.call(("x",));
        let y = delayed.call(("y",));
        assert_eq!(x.due(), Duration::from_millis(50));
        assert_eq!(y.state(), TimerState::Scheduled);

        scheduler.advance(Duration::from_millis(49)).unwrap();
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(scheduler.advance(Duration::from_millis(1)).unwrap(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("x", Duration::from_millis(50)),
                ("y", Duration::from_millis(50))
            ]
        );
        assert_eq!(x.state(), TimerState::Fired);
        assert_eq!(y.state(), TimerState::Fired);
    }

    #[test]
    fn it_produces_one_invocation_per_call() {
        let scheduler = ManualScheduler::new();
        let (log, target) = recording::<usize>(&scheduler);
        let delayed = delay(&scheduler, target, 0).unwrap();

        for i in 0..10 {
            delayed.call((i,));
        }
        assert!(log.lock().unwrap().is_empty());

        scheduler.run_until_idle().unwrap();
        let values: Vec<_> = log.lock().unwrap().iter().map(|(v, _)| *v).collect();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn it_fires_in_expiry_order() {
        let scheduler = ManualScheduler::new();
        let (log, target) = recording::<&'static str>(&scheduler);
        let target = Target::from_fn(target);
        let slow = delay(&scheduler, &target, 100).unwrap();
        let fast = delay(&scheduler, &target, 10).unwrap();

        slow.call(("slow",));
        fast.call(("fast",));
        scheduler.run_until_idle().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("fast", Duration::from_millis(10)),
                ("slow", Duration::from_millis(100))
            ]
        );
    }

    #[test]
    fn it_cancels_only_the_given_call() {
        let scheduler = ManualScheduler::new();
        let (log, target) = recording::<u8>(&scheduler);
        let delayed = delay(&scheduler, target, 20).unwrap();

        let first = delayed.call((1,));
        let second = delayed.call((2,));
        second.cancel();
        second.cancel();
        assert_eq!(second.state(), TimerState::Cancelled);
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_millis(20)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![(1, Duration::from_millis(20))]);

        // cancelling after the fact changes nothing
        first.cancel();
        assert_eq!(first.state(), TimerState::Fired);
    }

    #[test]
    fn it_captures_the_receiver_per_call() {
        struct Counter {
            label: &'static str,
        }

        let scheduler = ManualScheduler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let delayed = Delay::new(
            &scheduler,
            Target::method(move |this: &Counter, n: u32| {
                log.lock().unwrap().push(format!("{}:{n}", this.label))
            }),
            Duration::from_millis(5),
        )
        .unwrap();

        delayed.call_on(Counter { label: "a" }, (1,));
        delayed.call_on(Counter { label: "b" }, (2,));
        scheduler.run_until_idle().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["a:1", "b:2"]);
    }

    #[test]
    fn it_reports_failures_to_the_scheduler() {
        let scheduler = ManualScheduler::new();
        let delayed = delay(
            &scheduler,
            |n: i32| {
                if n < 0 {
                    Err(anyhow::anyhow!("negative input: {n}"))
                } else {
                    Ok(n)
                }
            },
            10,
        )
        .unwrap();

        delayed.call((1,));
        delayed.call((-1,));
        let errors = scheduler.advance(Duration::from_millis(10)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "negative input: -1");
    }

    #[test]
    fn it_rejects_missing_targets() {
        let scheduler = ManualScheduler::new();
        let missing: Option<fn(u8)> = None;
        assert_eq!(delay(&scheduler, missing, 10).unwrap_err(), InvalidTarget);
    }
}
