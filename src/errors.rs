use std::{
    fmt::{self, Display},
    ops::Deref,
};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid target: nothing to wrap")]
/// The value given to a wrapper factory does not hold a callable.
///
/// This is returned when the wrapper is created, never when it is called.
pub struct InvalidTarget;

#[derive(Debug, Error)]
#[error(transparent)]
/// An error returned by the wrapped function while it was running.
///
/// The original error is kept as is. Use [`anyhow::Error::downcast_ref`] through
/// `Deref` to recover the concrete type.
pub struct InvocationError(#[from] anyhow::Error);

impl InvocationError {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self(anyhow::Error::new(err))
    }
}

impl Deref for InvocationError {
    type Target = anyhow::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Multiple invocation errors collected while firing a batch of timers
#[derive(Error, Debug)]
pub struct AggregateError<E>(pub Vec<E>);

impl<E> From<Vec<E>> for AggregateError<E> {
    fn from(errors: Vec<E>) -> Self {
        Self(errors)
    }
}

impl<E> Display for AggregateError<E>
where
    E: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.0 {
            writeln!(f, "- {}", e)?;
        }
        Ok(())
    }
}

impl<E> Deref for AggregateError<E> {
    type Target = Vec<E>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<E> IntoIterator for AggregateError<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("deferred invocations failed:\n{0}")]
    Aggregate(#[from] AggregateError<InvocationError>),
}
