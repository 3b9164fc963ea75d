//! Per-invocation deadlines.

use actionkit_core::{
    Action, ActionDefinition, BoxError, InvocationError, PerformInput,
};
use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Run one `perform` future under an optional deadline.
///
/// Errors returned by the future are classified with [`classify`].
pub async fn with_deadline<F>(deadline: Option<Duration>, perform: F) -> Result<(), InvocationError>
where
    F: Future<Output = Result<(), BoxError>>,
{
    let Some(limit) = deadline else {
        return perform.await.map_err(classify);
    };
    match timeout(limit, perform).await {
        Ok(result) => result.map_err(classify),
        Err(_) => Err(InvocationError::Timeout(limit)),
    }
}

/// Turn a handler error into an [`InvocationError`].
///
/// Errors that already are an `InvocationError` (for instance from a
/// [`TimeoutAction`]) keep their kind; anything else is a perform failure.
pub fn classify(err: BoxError) -> InvocationError {
    match err.downcast::<InvocationError>() {
        Ok(err) => *err,
        Err(err) => InvocationError::Perform(err),
    }
}

/// An action that wraps another action with its own deadline.
///
/// Useful when one action needs a tighter limit than the runtime-wide one.
pub struct TimeoutAction<A> {
    inner: A,
    duration: Duration,
}

impl<A> TimeoutAction<A> {
    /// Wrap `inner` so each `perform` fails after `duration`.
    pub fn new(inner: A, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

impl<S, C, A> Action<S, C> for TimeoutAction<A>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
    A: Action<S, C>,
{
    fn definition(&self) -> &ActionDefinition {
        self.inner.definition()
    }

    async fn perform(&self, client: &C, input: PerformInput<'_, S>) -> Result<(), BoxError> {
        match timeout(self.duration, self.inner.perform(client, input)).await {
            Ok(result) => result,
            Err(_) => Err(Box::new(InvocationError::Timeout(self.duration))),
        }
    }
}
