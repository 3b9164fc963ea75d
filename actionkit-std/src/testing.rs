//! Testing utilities for actionkit.
//!
//! # Features
//!
//! - [`RecordingAction`]: An action that records every payload it receives
//! - [`FailingAction`]: An action whose `perform` always fails
//! - [`SlowAction`]: An action that sleeps before succeeding
//! - [`RecordingScriptLoader`]: A script loader that records requested URLs
//!
//! All of them implement [`Action`] for any settings and client type, so they
//! can be dropped into any destination's catalog.

use actionkit_core::{
    Action, ActionDefinition, BoxError, PerformInput, ScriptAttributes, ScriptHandle,
    ScriptLoader,
};
use serde_json::Value;
use std::{
    collections::BTreeSet,
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Recording Action
// ============================================================================

/// An action that records the payloads it is invoked with.
///
/// Clones share the same record, so keep one clone for assertions and hand
/// the other to the catalog.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingAction::new("Track Event");
/// let catalog = Catalog::new().action("trackEvent", recorder.clone());
///
/// // dispatch events...
/// assert_eq!(recorder.call_count(), 1);
/// ```
#[derive(Clone)]
pub struct RecordingAction {
    definition: ActionDefinition,
    payloads: Arc<Mutex<Vec<Value>>>,
    update: Option<(String, Value)>,
}

impl RecordingAction {
    /// Create a recording action with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_definition(ActionDefinition::new(title))
    }

    /// Create a recording action from a full definition.
    pub fn with_definition(definition: ActionDefinition) -> Self {
        Self {
            definition,
            payloads: Arc::new(Mutex::new(Vec::new())),
            update: None,
        }
    }

    /// Request an event update on every invocation.
    pub fn with_update(mut self, path: impl Into<String>, value: Value) -> Self {
        self.update = Some((path.into(), value));
        self
    }

    /// The recorded payloads, in completion order.
    pub fn payloads(&self) -> Vec<Value> {
        lock(&self.payloads).clone()
    }

    /// Number of invocations.
    pub fn call_count(&self) -> usize {
        lock(&self.payloads).len()
    }
}

impl<S, C> Action<S, C> for RecordingAction
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(&self, _client: &C, input: PerformInput<'_, S>) -> Result<(), BoxError> {
        if let Some((path, value)) = &self.update {
            input.update_event(path.clone(), value.clone());
        }
        lock(&self.payloads).push(input.payload);
        Ok(())
    }
}

// ============================================================================
// Failing Action
// ============================================================================

/// An action whose `perform` always returns an error.
#[derive(Clone)]
pub struct FailingAction {
    definition: ActionDefinition,
    message: String,
    calls: Arc<AtomicUsize>,
}

impl FailingAction {
    /// Create a failing action with the given title and error message.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            definition: ActionDefinition::new(title),
            message: message.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of invocations.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S, C> Action<S, C> for FailingAction
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(&self, _client: &C, _input: PerformInput<'_, S>) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.message.clone().into())
    }
}

// ============================================================================
// Slow Action
// ============================================================================

/// An action that sleeps for a fixed delay, then succeeds.
#[derive(Clone)]
pub struct SlowAction {
    definition: ActionDefinition,
    delay: Duration,
    completed: Arc<AtomicUsize>,
}

impl SlowAction {
    /// Create a slow action with the given title and delay.
    pub fn new(title: impl Into<String>, delay: Duration) -> Self {
        Self {
            definition: ActionDefinition::new(title),
            delay,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of invocations that ran to completion.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl<S, C> Action<S, C> for SlowAction
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(&self, _client: &C, _input: PerformInput<'_, S>) -> Result<(), BoxError> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Recording Script Loader
// ============================================================================

/// A script loader that records requests instead of loading anything.
#[derive(Clone, Default)]
pub struct RecordingScriptLoader {
    loaded: Arc<Mutex<Vec<ScriptHandle>>>,
    failing: Arc<Mutex<BTreeSet<String>>>,
}

impl RecordingScriptLoader {
    /// Create a loader that accepts every URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make loads of `url` fail.
    pub fn fail_on(&self, url: impl Into<String>) {
        lock(&self.failing).insert(url.into());
    }

    /// Scripts loaded so far.
    pub fn loaded(&self) -> Vec<ScriptHandle> {
        lock(&self.loaded).clone()
    }

    /// URLs loaded so far.
    pub fn urls(&self) -> Vec<String> {
        lock(&self.loaded).iter().map(|h| h.url.clone()).collect()
    }
}

impl ScriptLoader for RecordingScriptLoader {
    fn load_script<'a>(
        &'a self,
        url: &'a str,
        attributes: &'a ScriptAttributes,
    ) -> Pin<Box<dyn Future<Output = Result<ScriptHandle, BoxError>> + Send + 'a>> {
        Box::pin(async move {
            if lock(&self.failing).contains(url) {
                return Err(format!("failed to load script {url}").into());
            }
            let handle = ScriptHandle::new(url, attributes.clone());
            lock(&self.loaded).push(handle.clone());
            Ok(handle)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actionkit_core::{Event, EventPatch};
    use serde_json::json;

    #[tokio::test]
    async fn test_recording_action_records_and_patches() {
        let recorder = RecordingAction::new("Rec").with_update("integrations.Rec", json!(true));
        let (event, mapping, patch) = (Event::track("x"), json!({}), EventPatch::new());
        let input = PerformInput::new(json!({ "a": 1 }), &event, &(), &mapping, &patch);

        Action::<(), ()>::perform(&recorder.clone(), &(), input)
            .await
            .unwrap();

        assert_eq!(recorder.payloads(), vec![json!({ "a": 1 })]);
        assert_eq!(patch.take(), vec![("integrations.Rec".to_string(), json!(true))]);
    }

    #[tokio::test]
    async fn test_script_loader_records_and_fails() {
        let loader = RecordingScriptLoader::new();
        loader.fail_on("https://cdn.example.com/bad.js");
        let attrs = ScriptAttributes::new();

        assert!(loader.load_script("https://cdn.example.com/sdk.js", &attrs).await.is_ok());
        assert!(loader.load_script("https://cdn.example.com/bad.js", &attrs).await.is_err());
        assert_eq!(loader.urls(), vec!["https://cdn.example.com/sdk.js".to_string()]);
    }
}
