//! # Actions
//!
//! An action is the terminal unit of work: a named handler with a field schema
//! and a `perform` callback that receives the destination's shared client and
//! the mapped payload for one matching subscription.
//!
//! # Usage Patterns
//!
//! 1. **Struct implementation**: `impl Action<Settings, Client> for TrackEvent`
//! 2. **Closed catalog**: an `enum` of a destination's actions implementing
//!    [`Action`] once and matching on `self`
//!
//! Actions are stored type-erased as [`DynAction`] so a destination can hold
//! a heterogeneous catalog.

use crate::{error::BoxError, event::Event, schema::FieldSchema};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{
    future::Future,
    pin::Pin,
    sync::{Mutex, PoisonError},
};

/// The pipeline stage a plugin runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleHook {
    /// Runs first, sequentially, and may rewrite the event.
    Before,
    /// Runs after `before` plugins, sequentially, to enrich the event.
    Enrichment,
    /// Runs last, concurrently with the other destinations.
    #[default]
    Destination,
}

impl LifecycleHook {
    /// The wire name of this stage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::Before => "before",
            LifecycleHook::Enrichment => "enrichment",
            LifecycleHook::Destination => "destination",
        }
    }
}

/// Static description of an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionDefinition {
    /// Human readable title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Fields accepted by `perform`.
    pub fields: FieldSchema,
    /// Query used by the preset subscription for this action.
    pub default_subscription: Option<String>,
    /// The pipeline stage of the plugin wrapping this action.
    pub lifecycle: LifecycleHook,
}

impl ActionDefinition {
    /// Create a definition with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the field schema.
    pub fn with_fields(mut self, fields: FieldSchema) -> Self {
        self.fields = fields;
        self
    }

    /// Set the preset subscription query.
    pub fn with_default_subscription(mut self, query: impl Into<String>) -> Self {
        self.default_subscription = Some(query.into());
        self
    }

    /// Set the pipeline stage.
    pub fn with_lifecycle(mut self, lifecycle: LifecycleHook) -> Self {
        self.lifecycle = lifecycle;
        self
    }
}

/// Patches to the incoming event recorded by one invocation.
///
/// Patches are collected while invocations run concurrently and applied to the
/// event once the whole fan-out has settled, in subscription order.
#[derive(Debug, Default)]
pub struct EventPatch {
    updates: Mutex<Vec<(String, Value)>>,
}

impl EventPatch {
    /// Create an empty patch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update of `path` to `value`.
    pub fn record(&self, path: impl Into<String>, value: Value) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.into(), value));
    }

    /// Take every recorded update, leaving the set empty.
    pub fn take(&self) -> Vec<(String, Value)> {
        std::mem::take(&mut *self.updates.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of recorded updates.
    pub fn len(&self) -> usize {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything `perform` receives besides the client.
pub struct PerformInput<'a, S> {
    /// The payload produced by the subscription's mapping.
    pub payload: Value,
    /// The incoming event, as it was when the fan-out started.
    pub event: &'a Event,
    /// The destination's typed settings.
    pub settings: &'a S,
    /// The raw mapping of the matching subscription.
    pub mapping: &'a Value,
    patch: &'a EventPatch,
}

impl<'a, S> PerformInput<'a, S> {
    /// Assemble the input for one invocation.
    pub fn new(
        payload: Value,
        event: &'a Event,
        settings: &'a S,
        mapping: &'a Value,
        patch: &'a EventPatch,
    ) -> Self {
        Self {
            payload,
            event,
            settings,
            mapping,
            patch,
        }
    }

    /// Deserialize the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Request an update of the event at a dotted path.
    ///
    /// The update is applied after every invocation for this event settles.
    pub fn update_event(&self, path: impl Into<String>, value: Value) {
        self.patch.record(path, value);
    }
}

/// A handler invoked once per matching subscription.
///
/// `S` is the destination's settings type and `C` its client handle.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `Action` for settings `{S}` and client `{C}`",
    label = "missing `Action` implementation",
    note = "Actions must implement `definition` and `perform`."
)]
pub trait Action<S, C>: Send + Sync + 'static
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Static description of the action.
    fn definition(&self) -> &ActionDefinition;

    /// Execute the action for one matched subscription.
    fn perform(
        &self,
        client: &C,
        input: PerformInput<'_, S>,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Dynamic object-safe version of [`Action`].
pub trait DynAction<S, C>: Send + Sync + 'static
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Static description of the action.
    fn definition(&self) -> &ActionDefinition;

    /// Execute the action (dynamic dispatch version).
    fn perform_dyn<'a>(
        &'a self,
        client: &'a C,
        input: PerformInput<'a, S>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;
}

// Blanket implementation: Any type implementing Action implements DynAction automatically.
impl<S, C, T> DynAction<S, C> for T
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
    T: Action<S, C>,
{
    fn definition(&self) -> &ActionDefinition {
        Action::definition(self)
    }

    fn perform_dyn<'a>(
        &'a self,
        client: &'a C,
        input: PerformInput<'a, S>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(self.perform(client, input))
    }
}
