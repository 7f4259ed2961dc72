use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::trace;

use crate::errors::InvalidTarget;
use crate::sync::Lock;
use crate::target::{IntoTarget, Target};

/// Cache results by argument
///
/// The first call with some arguments runs the target and stores its result;
/// later calls with equal arguments return a copy of the stored result without
/// running the target. The receiver is not part of the cache key.
///
/// Every result is cached, including errors. Clones share the cache.
pub struct Memoize<C, A, R> {
    target: Target<C, A, R>,
    cache: Arc<Lock<HashMap<A, R>>>,
}

impl<C, A, R> Clone for Memoize<C, A, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C, A, R> fmt::Debug for Memoize<C, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoize")
            .field("cached", &self.cache.lock().len())
            .finish()
    }
}

/// Wrap a function so equal arguments are only computed once
///
/// ```rust
/// use decorate::memoize;
///
/// let square = memoize(|n: u64| n * n).unwrap();
/// assert_eq!(square.call((12,)), 144);
/// assert_eq!(square.call((12,)), 144);
/// assert_eq!(square.len(), 1);
/// ```
pub fn memoize<T, A, M>(target: T) -> Result<Memoize<(), A, T::Output>, InvalidTarget>
where
    T: IntoTarget<(), A, M>,
{
    Memoize::new(target)
}

impl<C, A, R> Memoize<C, A, R> {
    /// Create a memoizing wrapper for a target that may take a receiver
    pub fn new<T, M>(target: T) -> Result<Self, InvalidTarget>
    where
        T: IntoTarget<C, A, M, Output = R>,
    {
        Ok(Self {
            target: target.into_target()?,
            cache: Arc::new(Lock::new(HashMap::new())),
        })
    }

    /// Number of cached results
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached result
    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl<C, A, R> Memoize<C, A, R>
where
    A: Hash + Eq + Clone,
    R: Clone,
{
    /// Return the cached result for `args`, calling the target on `receiver` if
    /// there is none
    pub fn call_on(&self, receiver: &C, args: A) -> R {
        if let Some(cached) = self.cache.lock().get(&args) {
            trace!("cache hit");
            return cached.clone();
        }

        // the cache is not locked while the target runs, it may call the
        // wrapper again with other arguments
        let result = self.target.call(receiver, args.clone());
        self.cache.lock().entry(args).or_insert(result).clone()
    }
}

impl<C, A, R> Memoize<C, A, R>
where
    C: 'static,
    A: Hash + Eq + Clone + Send + 'static,
    R: Clone + Send + 'static,
{
    /// Use the memoized function where a [`Target`] is expected
    pub fn to_target(&self) -> Target<C, A, R> {
        let memo = self.clone();
        Target::new(move |receiver: &C, args: A| memo.call_on(receiver, args))
    }
}

impl<A, R> Memoize<(), A, R>
where
    A: Hash + Eq + Clone,
    R: Clone,
{
    /// Return the cached result for `args`, calling the target if there is none
    pub fn call(&self, args: A) -> R {
        self.call_on(&(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spy::spy;

    #[test]
    fn it_computes_equal_arguments_once() {
        let slow = spy(|a: u32, b: u32| a.pow(b)).unwrap();
        let fast = memoize(slow.to_target()).unwrap();

        assert_eq!(fast.call((2, 10)), 1024);
        assert_eq!(fast.call((2, 10)), 1024);
        assert_eq!(fast.call((3, 2)), 9);

        assert_eq!(slow.calls(), vec![(2, 10), (3, 2)]);
        assert_eq!(fast.len(), 2);
    }

    #[test]
    fn it_recomputes_after_clear() {
        let slow = spy(|s: &'static str| s.len()).unwrap();
        let fast = memoize(slow.to_target()).unwrap();

        fast.call(("hello",));
        fast.clear();
        assert!(fast.is_empty());
        fast.call(("hello",));

        assert_eq!(slow.call_count(), 2);
    }

    #[test]
    fn it_supports_recursive_targets() {
        let slot: Arc<Lock<Option<Memoize<(), (u64,), u64>>>> = Arc::new(Lock::new(None));
        let inner = slot.clone();
        let fib = memoize(move |n: u64| {
            if n < 2 {
                return n;
            }
            let memo = inner.lock().clone();
            match memo {
                Some(fib) => fib.call((n - 1,)) + fib.call((n - 2,)),
                None => 0,
            }
        })
        .unwrap();
        *slot.lock() = Some(fib.clone());

        assert_eq!(fib.call((80,)), 23_416_728_348_467_685);
        assert_eq!(fib.len(), 81);
    }
}
