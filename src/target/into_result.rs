use crate::errors::InvocationError;

/// Result of a deferred invocation, as seen by the scheduler
pub type Outcome = Result<(), InvocationError>;

/// Conversion of a deferred function's return value into an [`Outcome`]
///
/// Deferred wrappers return to their caller before the function runs, so the
/// value itself is discarded and only a failure is reported, through the
/// scheduler.
pub trait IntoResult {
    fn into_result(self) -> Outcome;
}

impl IntoResult for () {
    fn into_result(self) -> Outcome {
        Ok(())
    }
}

/// Allow deferred functions to fail with any error `anyhow` can hold,
/// including `anyhow::Error` itself
impl<T, E> IntoResult for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn into_result(self) -> Outcome {
        self.map(|_| ())
            .map_err(|e| InvocationError::from(e.into()))
    }
}
