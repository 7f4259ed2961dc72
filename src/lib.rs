#![cfg_attr(docsrs, feature(doc_cfg))]
//! decorate wraps ordinary Rust functions to change *when* they run or to
//! observe *how* they are called, without touching the functions themselves.
//!
//! # Wrappers
//!
//! - [`delay`]: every call runs a fixed time later. Calls are independent and
//!   each one can be cancelled through the returned [`CancelHandle`].
//! - [`debounce`]: a burst of calls results in a single call, with the data of
//!   the last one, once no call was made for a quiet period.
//! - [`throttle`]: at most one call per interval; the last call made during the
//!   interval runs when it ends.
//! - [`spy`]: records the arguments of every call before forwarding it.
//! - [`memoize`]: caches results by argument.
//!
//! # Targets
//!
//! Wrappers take any `Fn` with up to 12 arguments. Arguments are passed to the
//! wrapper as a tuple.
//!
//! ```rust
//! use decorate::spy;
//!
//! let add = spy(|a: i32, b: i32| a + b).unwrap();
//! assert_eq!(add.call((1, 2)), 3);
//! ```
//!
//! A function may also expect a receiver, given per call rather than when
//! wrapping. Use [`Target::method`] and the `call_on` method of the wrapper.
//!
//! ```rust
//! use decorate::{Spy, Target};
//!
//! struct User {
//!     name: String,
//! }
//!
//! let greet = Spy::new(Target::method(|user: &User, greeting: &'static str| {
//!     format!("{greeting}, {}", user.name)
//! }))
//! .unwrap();
//!
//! let user = User { name: "John".into() };
//! assert_eq!(greet.call_on(&user, ("Hello",)), "Hello, John");
//! ```
//!
//! A [`Target`] is a shared reference to the function, so the same function can
//! be given to several wrappers. Wrapping an `Option` that turns out to be `None`
//! fails with [`InvalidTarget`] when the wrapper is created.
//!
//! # Scheduling
//!
//! Timing wrappers never block or spawn threads. They hand their work to a
//! [`Scheduler`](timer::Scheduler), which runs it once the delay has elapsed:
//!
//! - [`ManualScheduler`] uses a virtual clock moved by hand, which makes timing
//!   behavior fully deterministic.
//! - [`TokioScheduler`] uses the timer of the current tokio runtime.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use decorate::{debounce, ManualScheduler};
//!
//! let scheduler = ManualScheduler::new();
//! let saved = Arc::new(Mutex::new(Vec::new()));
//! let log = saved.clone();
//! let save = debounce(&scheduler, move |text: &'static str| log.lock().unwrap().push(text), 100)
//!     .unwrap();
//!
//! save.call(("a",));
//! scheduler.advance(Duration::from_millis(50)).unwrap();
//! save.call(("b",));
//! scheduler.advance(Duration::from_millis(100)).unwrap();
//!
//! // the first call was superseded by the second
//! assert_eq!(*saved.lock().unwrap(), vec!["b"]);
//! ```
//!
//! # Errors
//!
//! Wrappers never swallow errors. Synchronous wrappers return the target's
//! result as is. Deferred calls cannot return anything to their caller, so
//! their targets must return `()` or a `Result`; an `Err` is reported through
//! the scheduler instead: [`ManualScheduler::advance`] returns every failure
//! of the jobs it ran, and [`TokioScheduler`] sends them to its [`Errors`]
//! stream.
//!
//! # Logging
//!
//! The library uses the [tracing crate](https://crates.io/crates/tracing) to
//! report timers being scheduled, cancelled and fired. With the `logging`
//! feature, [`init_logging`] installs a subscriber configured through
//! `RUST_LOG`.

mod debounce;
mod delay;
mod memoize;
mod spy;
mod sync;
mod throttle;

pub mod errors;
pub mod target;
pub mod timer;

#[cfg(feature = "logging")]
mod logging;

#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
#[cfg(feature = "logging")]
pub use logging::init as init_logging;

pub use debounce::{debounce, Debounce};
pub use delay::{delay, Delay};
pub use errors::{Error, InvalidTarget, InvocationError};
pub use memoize::{memoize, Memoize};
pub use spy::{spy, CallLog, Spy};
pub use target::Target;
pub use throttle::{throttle, Throttle};
pub use timer::{CancelHandle, Errors, ManualScheduler, TimerState, TokioScheduler};

/// Wrapper factories, wrapper types and the scheduler trait
pub mod prelude {
    pub use super::timer::Scheduler;
    pub use super::{
        debounce, delay, memoize, spy, throttle, CancelHandle, Debounce, Delay, ManualScheduler,
        Memoize, Spy, Target, Throttle, TimerState, TokioScheduler,
    };
}
