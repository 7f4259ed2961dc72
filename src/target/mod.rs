//! Wrapped functions and their captured invocations
//!
//! A [`Target`] is a shared reference to the original function. Wrappers never
//! own the function itself, so one target may be given to several wrappers.
//! Every call to a wrapper captures an [`Invocation`], holding the receiver and
//! arguments of that call, which is run (or dropped) exactly once.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

mod handler;
mod into_result;

pub use handler::{Callable, Method};
pub use into_result::{IntoResult, Outcome};

use crate::errors::InvalidTarget;

type BoxedFn<C, A, R> = Arc<dyn Fn(&C, A) -> R + Send + Sync>;

/// A shared, immutable reference to a wrapped function
///
/// `C` is the type of the receiver the function is called on, `A` the tuple of
/// arguments and `R` the return type. Plain functions ignore the receiver.
pub struct Target<C, A, R> {
    call: BoxedFn<C, A, R>,
}

impl<C, A, R> Clone for Target<C, A, R> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<C, A, R> fmt::Debug for Target<C, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("fn", &std::any::type_name::<R>())
            .finish()
    }
}

impl<C: 'static, A: 'static, R: 'static> Target<C, A, R> {
    /// Create a target from a function taking the receiver and the argument tuple
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&C, A) -> R + Send + Sync + 'static,
    {
        Self { call: Arc::new(f) }
    }

    /// Create a target from a plain function
    ///
    /// ```rust
    /// use decorate::target::Target;
    ///
    /// let add = Target::<(), _, _>::from_fn(|a: i32, b: i32| a + b);
    /// assert_eq!(add.call(&(), (1, 2)), 3);
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Callable<A, Output = R>,
    {
        Self {
            call: Arc::new(move |_: &C, args: A| f.call(args)),
        }
    }

    /// Create a target from a function that takes a receiver
    ///
    /// ```rust
    /// use decorate::target::Target;
    ///
    /// struct User {
    ///     name: String,
    /// }
    ///
    /// let greet = Target::method(|user: &User, greeting: &'static str| {
    ///     format!("{greeting}, {}", user.name)
    /// });
    /// let user = User { name: "John".into() };
    /// assert_eq!(greet.call(&user, ("Hi",)), "Hi, John");
    /// ```
    pub fn method<F>(f: F) -> Self
    where
        F: Method<C, A, Output = R>,
    {
        Self {
            call: Arc::new(move |receiver: &C, args: A| f.call(receiver, args)),
        }
    }

    /// Transform the value returned by the target
    pub(crate) fn map<O, M>(self, f: M) -> Target<C, A, O>
    where
        M: Fn(R) -> O + Send + Sync + 'static,
    {
        let call = self.call;
        Target {
            call: Arc::new(move |receiver: &C, args: A| f(call(receiver, args))),
        }
    }
}

impl<C, A, R> Target<C, A, R> {
    /// Call the target function
    ///
    /// The return value, including any error, is given back unchanged.
    pub fn call(&self, receiver: &C, args: A) -> R {
        (self.call)(receiver, args)
    }

    /// Returns true if both targets reference the same function
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

/// A single call to a target, captured at call time
///
/// The receiver and the arguments are moved into the invocation when the wrapper
/// is called, so later changes by the caller cannot affect them. Running the
/// invocation consumes it.
pub struct Invocation<C, A, R> {
    target: Target<C, A, R>,
    receiver: C,
    args: A,
}

impl<C, A, R> Invocation<C, A, R> {
    pub fn new(target: Target<C, A, R>, receiver: C, args: A) -> Self {
        Self {
            target,
            receiver,
            args,
        }
    }

    pub fn receiver(&self) -> &C {
        &self.receiver
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    /// Run the target with the captured receiver and arguments
    pub fn invoke(self) -> R {
        let Self {
            target,
            receiver,
            args,
        } = self;
        target.call(&receiver, args)
    }
}

/// Marker for targets converted from a plain function
pub struct Plain;

/// Marker for an existing [`Target`] being shared
pub struct Shared;

/// Marker for targets that may be missing
pub struct Optional<M>(PhantomData<M>);

/// Conversion into a [`Target`]
///
/// This is what every wrapper factory accepts. The conversion fails with
/// [`InvalidTarget`] when there is no function to wrap, so the error surfaces
/// when wrapping rather than when calling.
///
/// The `M` parameter only distinguishes the implementations.
pub trait IntoTarget<C, A, M> {
    type Output;

    fn into_target(self) -> Result<Target<C, A, Self::Output>, InvalidTarget>;
}

impl<F, C, A> IntoTarget<C, A, Plain> for F
where
    F: Callable<A>,
    C: 'static,
    A: 'static,
    F::Output: 'static,
{
    type Output = F::Output;

    fn into_target(self) -> Result<Target<C, A, Self::Output>, InvalidTarget> {
        Ok(Target::from_fn(self))
    }
}

impl<C, A, R> IntoTarget<C, A, Shared> for Target<C, A, R> {
    type Output = R;

    fn into_target(self) -> Result<Target<C, A, R>, InvalidTarget> {
        Ok(self)
    }
}

impl<C, A, R> IntoTarget<C, A, Shared> for &Target<C, A, R> {
    type Output = R;

    fn into_target(self) -> Result<Target<C, A, R>, InvalidTarget> {
        Ok(self.clone())
    }
}

impl<T, C, A, M> IntoTarget<C, A, Optional<M>> for Option<T>
where
    T: IntoTarget<C, A, M>,
{
    type Output = T::Output;

    fn into_target(self) -> Result<Target<C, A, Self::Output>, InvalidTarget> {
        self.ok_or(InvalidTarget)?.into_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wrap<T, A, M>(target: T) -> Result<Target<(), A, T::Output>, InvalidTarget>
    where
        T: IntoTarget<(), A, M>,
    {
        target.into_target()
    }

    #[test]
    fn it_invokes_the_target_once_with_the_captured_args() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let target = wrap(move |a: usize, b: usize| {
            seen.fetch_add(1, Ordering::SeqCst);
            a + b
        })
        .unwrap();

        let invocation = Invocation::new(target, (), (1, 2));
        assert_eq!(invocation.args(), &(1, 2));
        assert_eq!(invocation.invoke(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn it_passes_the_receiver_captured_at_call_time() {
        let target =
            Target::method(|prefix: &String, name: &'static str| format!("{prefix}{name}"));
        let first = Invocation::new(target.clone(), "Mr. ".to_string(), ("Smith",));
        let second = Invocation::new(target, "Ms. ".to_string(), ("Jones",));

        assert_eq!(second.invoke(), "Ms. Jones");
        assert_eq!(first.invoke(), "Mr. Smith");
    }

    #[test]
    fn it_propagates_target_errors_unchanged() {
        let target = wrap(|n: i32| {
            if n < 0 {
                Err(format!("negative: {n}"))
            } else {
                Ok(n)
            }
        })
        .unwrap();

        assert_eq!(target.call(&(), (1,)), Ok(1));
        assert_eq!(target.call(&(), (-1,)), Err("negative: -1".to_string()));
    }

    #[test]
    fn it_rejects_missing_targets() {
        let missing: Option<fn(i32) -> i32> = None;
        assert_eq!(wrap(missing).unwrap_err(), InvalidTarget);

        let present: Option<fn(i32) -> i32> = Some(|n| n + 1);
        assert_eq!(wrap(present).unwrap().call(&(), (1,)), 2);
    }

    #[test]
    fn it_shares_targets() {
        let target = wrap(|| "shared").unwrap();
        let other = wrap(&target).unwrap();
        assert!(target.ptr_eq(&other));
    }
}
