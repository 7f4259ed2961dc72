use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::trace;

use crate::errors::InvalidTarget;
use crate::sync::Lock;
use crate::target::{IntoTarget, Target};

/// Arguments of every call made to a [`Spy`], in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLog<A>(Vec<A>);

impl<A> Default for CallLog<A> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<A> CallLog<A> {
    fn push(&mut self, args: A) {
        self.0.push(args);
    }

    pub fn into_inner(self) -> Vec<A> {
        self.0
    }
}

impl<A> Deref for CallLog<A> {
    type Target = [A];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<A> IntoIterator for CallLog<A> {
    type Item = A;
    type IntoIter = std::vec::IntoIter<A>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<A: PartialEq> PartialEq<Vec<A>> for CallLog<A> {
    fn eq(&self, other: &Vec<A>) -> bool {
        &self.0 == other
    }
}

/// Record the arguments of every call before forwarding it
///
/// The spy returns whatever the target returns. Arguments are recorded before
/// the target runs, so calls that fail are recorded too.
///
/// Clones share the same log.
pub struct Spy<C, A, R> {
    target: Target<C, A, R>,
    calls: Arc<Lock<CallLog<A>>>,
}

impl<C, A, R> Clone for Spy<C, A, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<C, A: fmt::Debug, R> fmt::Debug for Spy<C, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("calls", &*self.calls.lock())
            .finish()
    }
}

/// Wrap a function to record every call made to it
///
/// ```rust
/// use decorate::spy;
///
/// let add = spy(|a: i32, b: i32| a + b).unwrap();
/// assert_eq!(add.call((1, 2)), 3);
/// assert_eq!(add.call((3, 4)), 7);
/// assert_eq!(add.calls(), vec![(1, 2), (3, 4)]);
/// ```
pub fn spy<T, A, M>(target: T) -> Result<Spy<(), A, T::Output>, InvalidTarget>
where
    T: IntoTarget<(), A, M>,
{
    Spy::new(target)
}

impl<C, A, R> Spy<C, A, R> {
    /// Create a spy for a target that may take a receiver
    pub fn new<T, M>(target: T) -> Result<Self, InvalidTarget>
    where
        T: IntoTarget<C, A, M, Output = R>,
    {
        Ok(Self {
            target: target.into_target()?,
            calls: Arc::new(Lock::new(CallLog::default())),
        })
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<C, A: Clone, R> Spy<C, A, R> {
    /// Record `args`, then call the target on `receiver`
    pub fn call_on(&self, receiver: &C, args: A) -> R {
        {
            let mut calls = self.calls.lock();
            calls.push(args.clone());
            trace!(call = calls.len(), "call recorded");
        }
        self.target.call(receiver, args)
    }

    /// A copy of the calls recorded so far
    pub fn calls(&self) -> CallLog<A> {
        self.calls.lock().clone()
    }
}

impl<C, A, R> Spy<C, A, R>
where
    C: 'static,
    A: Clone + Send + 'static,
    R: 'static,
{
    /// Use the spy where a [`Target`] is expected
    ///
    /// Calls made through the returned target are recorded in this spy's log.
    pub fn to_target(&self) -> Target<C, A, R> {
        let spy = self.clone();
        Target::new(move |receiver: &C, args: A| spy.call_on(receiver, args))
    }
}

impl<A: Clone, R> Spy<(), A, R> {
    /// Record `args`, then call the target
    pub fn call(&self, args: A) -> R {
        self.call_on(&(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::delay;
    use crate::timer::ManualScheduler;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn it_records_calls_in_order() {
        let add = spy(|a: i32, b: i32| a + b).unwrap();
        assert_eq!(add.call_count(), 0);

        assert_eq!(add.call((1, 2)), 3);
        assert_eq!(add.call((3, 4)), 7);

        assert_eq!(add.call_count(), 2);
        assert_eq!(add.calls(), vec![(1, 2), (3, 4)]);
    }

    #[test]
    fn it_records_failed_calls() {
        let parse = spy(|input: &'static str| input.parse::<u32>()).unwrap();

        assert_eq!(parse.call(("42",)), Ok(42));
        assert!(parse.call(("forty-two",)).is_err());

        assert_eq!(parse.calls(), vec![("42",), ("forty-two",)]);
    }

    #[test]
    fn it_forwards_the_receiver() {
        struct Account {
            balance: i64,
        }

        let spied = Spy::new(Target::method(|this: &Account, amount: i64| {
            this.balance + amount
        }))
        .unwrap();
        let account = Account { balance: 100 };

        assert_eq!(spied.call_on(&account, (50,)), 150);
        assert_eq!(spied.calls(), vec![(50,)]);
    }

    #[test]
    fn it_shares_the_log_between_clones() {
        let noop = spy(|_: u8| ()).unwrap();
        let other = noop.clone();

        noop.call((1,));
        other.call((2,));

        assert_eq!(noop.calls().into_inner(), vec![(1,), (2,)]);
    }

    #[test]
    fn it_allows_the_target_to_inspect_its_own_log() {
        let slot: Arc<Lock<Option<Spy<(), (u8,), usize>>>> = Arc::new(Lock::new(None));
        let inner = slot.clone();
        let counted = spy(move |_: u8| {
            inner
                .lock()
                .as_ref()
                .map(|spy| spy.call_count())
                .unwrap_or_default()
        })
        .unwrap();
        *slot.lock() = Some(counted.clone());

        assert_eq!(counted.call((0,)), 1);
        assert_eq!(counted.call((0,)), 2);
    }

    #[test]
    fn it_records_deferred_calls_when_they_run() {
        let scheduler = ManualScheduler::new();
        let spied = spy(|_: &'static str| ()).unwrap();
        let delayed = delay(&scheduler, spied.to_target(), 10).unwrap();

        delayed.call(("later",));
        assert_eq!(spied.call_count(), 0);

        scheduler.advance(Duration::from_millis(10)).unwrap();
        assert_eq!(spied.calls(), vec![("later",)]);
    }
}
