//! # Plugins
//!
//! A plugin is the unit the embedding pipeline sees. Each action of a loaded
//! destination becomes one [`ActionPlugin`], named `"<destination> <action>"`,
//! so the pipeline can order, enable and disable them independently while
//! they share one lazily initialized client.
//!
//! # Dispatch
//!
//! For one incoming event, [`ActionPlugin::dispatch`]:
//!
//! 1. walks the action's subscriptions in declaration order, keeping the
//!    enabled ones whose query matches, and builds and validates each payload
//!    (all synchronous, before any `perform` starts);
//! 2. runs every matched invocation concurrently, each under the configured
//!    deadline, and waits for all of them to settle;
//! 3. applies the event updates requested by the invocations, in
//!    subscription order.
//!
//! A failing invocation is logged and reported in the [`DispatchReport`]; it
//! never stops its siblings, and the event is always returned.

use crate::{
    destination::{AnalyticsContext, Destination},
    runtime::DestinationRuntime,
    subscription::CompiledSubscription,
};
use actionkit_core::{
    DynAction, Event, EventPatch, EventType, InvocationError, LifecycleHook, PerformInput,
    PluginError,
};
use actionkit_std::deadline::with_deadline;
use futures::future::join_all;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use tracing::{Instrument, debug, info_span, warn};

/// The result of one matched invocation.
#[derive(Debug)]
pub struct InvocationOutcome {
    /// Name of the subscription that matched.
    pub subscription: String,
    /// What the invocation returned.
    pub result: Result<(), InvocationError>,
}

/// What happened while dispatching one event to one plugin.
#[derive(Debug)]
pub struct DispatchReport {
    /// The event, with every requested update applied.
    pub event: Event,
    /// One outcome per matched subscription, in subscription order.
    pub outcomes: Vec<InvocationOutcome>,
}

impl DispatchReport {
    /// Number of subscriptions that matched.
    pub fn matched(&self) -> usize {
        self.outcomes.len()
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &InvocationOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Whether every matched invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// A plugin in the host's event pipeline.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Plugin`",
    label = "missing `Plugin` implementation",
    note = "Plugins must implement `name`, `plugin_type`, `load`, `is_loaded` and `handle`."
)]
pub trait Plugin: Send + Sync + 'static {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// The pipeline stage of this plugin.
    fn plugin_type(&self) -> LifecycleHook;

    /// Prepare the plugin. Safe to call concurrently and repeatedly.
    fn load(
        &self,
        analytics: &AnalyticsContext,
    ) -> impl Future<Output = Result<(), PluginError>> + Send;

    /// Whether `load` completed successfully.
    fn is_loaded(&self) -> bool;

    /// Process one event.
    fn handle(
        &self,
        event: &Event,
    ) -> impl Future<Output = Result<DispatchReport, PluginError>> + Send;

    /// Process a `track` event, returning the updated copy.
    ///
    /// The caller keeps `event`, so it can be retried after a `NotLoaded` or
    /// `Initialization` error.
    fn track(&self, event: &Event) -> impl Future<Output = Result<Event, PluginError>> + Send {
        async move { self.handle(event).await.map(|report| report.event) }
    }

    /// Process a `page` event.
    fn page(&self, event: &Event) -> impl Future<Output = Result<Event, PluginError>> + Send {
        async move { self.handle(event).await.map(|report| report.event) }
    }

    /// Process an `identify` event.
    fn identify(&self, event: &Event) -> impl Future<Output = Result<Event, PluginError>> + Send {
        async move { self.handle(event).await.map(|report| report.event) }
    }

    /// Process a `group` event.
    fn group(&self, event: &Event) -> impl Future<Output = Result<Event, PluginError>> + Send {
        async move { self.handle(event).await.map(|report| report.event) }
    }

    /// Process an `alias` event.
    fn alias(&self, event: &Event) -> impl Future<Output = Result<Event, PluginError>> + Send {
        async move { self.handle(event).await.map(|report| report.event) }
    }
}

/// Dynamic object-safe version of [`Plugin`].
pub trait DynPlugin: Send + Sync + 'static {
    /// Unique plugin name.
    fn name(&self) -> &str;

    /// The pipeline stage of this plugin.
    fn plugin_type(&self) -> LifecycleHook;

    /// Whether `load` completed successfully.
    fn is_loaded(&self) -> bool;

    /// Prepare the plugin (dynamic dispatch version).
    fn load_dyn<'a>(
        &'a self,
        analytics: &'a AnalyticsContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;

    /// Process one event (dynamic dispatch version).
    fn handle_dyn<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = Result<DispatchReport, PluginError>> + Send + 'a>>;
}

// Blanket implementation: Any type implementing Plugin implements DynPlugin automatically.
impl<T: Plugin> DynPlugin for T {
    fn name(&self) -> &str {
        Plugin::name(self)
    }

    fn plugin_type(&self) -> LifecycleHook {
        Plugin::plugin_type(self)
    }

    fn is_loaded(&self) -> bool {
        Plugin::is_loaded(self)
    }

    fn load_dyn<'a>(
        &'a self,
        analytics: &'a AnalyticsContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>> {
        Box::pin(self.load(analytics))
    }

    fn handle_dyn<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = Result<DispatchReport, PluginError>> + Send + 'a>> {
        Box::pin(self.handle(event))
    }
}

/// The plugin wrapping one action of a loaded destination.
pub struct ActionPlugin<D: Destination> {
    name: String,
    action_key: String,
    action: Arc<dyn DynAction<D::Settings, D::Client>>,
    runtime: Arc<DestinationRuntime<D>>,
    subscriptions: Vec<CompiledSubscription>,
    perform_timeout: Option<Duration>,
}

impl<D: Destination> ActionPlugin<D> {
    pub(crate) fn new(
        action_key: String,
        action: Arc<dyn DynAction<D::Settings, D::Client>>,
        runtime: Arc<DestinationRuntime<D>>,
        subscriptions: Vec<CompiledSubscription>,
        perform_timeout: Option<Duration>,
    ) -> Self {
        Self {
            name: format!("{} {}", runtime.name(), action_key),
            action_key,
            action,
            runtime,
            subscriptions,
            perform_timeout,
        }
    }

    /// The key of the wrapped action.
    pub fn action_key(&self) -> &str {
        &self.action_key
    }

    /// The subscriptions bound to this action, in declaration order.
    pub fn subscriptions(&self) -> &[CompiledSubscription] {
        &self.subscriptions
    }

    /// The shared destination runtime.
    pub fn runtime(&self) -> &Arc<DestinationRuntime<D>> {
        &self.runtime
    }

    /// Dispatch one event to every matching subscription of this action.
    ///
    /// Fails only when the destination is not loaded or failed to initialize;
    /// invocation failures are reported in the returned [`DispatchReport`].
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchReport, PluginError> {
        let client = match self.runtime.client() {
            Some(client) => client?,
            None => return Err(PluginError::NotLoaded(self.name.clone())),
        };
        let definition = self.action.definition();
        let source = event.to_value();

        let prepared: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|subscription| {
                let matched = subscription.matches(event);
                if !matched {
                    debug!(
                        plugin = %self.name,
                        subscription = subscription.name(),
                        "subscription skipped"
                    );
                }
                matched
            })
            .map(|subscription| {
                let payload = subscription.payload(&source);
                let checked = definition
                    .fields
                    .validate(&payload)
                    .map(|()| payload)
                    .map_err(InvocationError::from);
                (subscription, checked)
            })
            .collect();

        let patches: Vec<EventPatch> = prepared.iter().map(|_| EventPatch::new()).collect();
        let settings = self.runtime.settings();
        let invocations = prepared
            .into_iter()
            .zip(&patches)
            .map(move |((subscription, payload), patch)| {
                let span = info_span!(
                    "perform",
                    destination = self.runtime.name(),
                    action = %self.action_key,
                    subscription = subscription.name(),
                );
                async move {
                    let result = match payload {
                        Ok(payload) => {
                            let input = PerformInput::new(
                                payload,
                                event,
                                settings,
                                subscription.raw_mapping(),
                                patch,
                            );
                            with_deadline(
                                self.perform_timeout,
                                self.action.perform_dyn(client, input),
                            )
                            .await
                        }
                        Err(err) => Err(err),
                    };
                    if let Err(err) = &result {
                        warn!(error = %err, "invocation failed");
                    }
                    InvocationOutcome {
                        subscription: subscription.name().to_string(),
                        result,
                    }
                }
                .instrument(span)
            });
        let outcomes = join_all(invocations).await;

        let mut event = event.clone();
        for patch in &patches {
            for (path, value) in patch.take() {
                if let Err(err) = event.update(&path, value) {
                    warn!(plugin = %self.name, path = %path, error = %err, "event update rejected");
                }
            }
        }

        Ok(DispatchReport { event, outcomes })
    }
}

impl<D: Destination> Plugin for ActionPlugin<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn plugin_type(&self) -> LifecycleHook {
        self.action.definition().lifecycle
    }

    async fn load(&self, analytics: &AnalyticsContext) -> Result<(), PluginError> {
        self.runtime.initialize(analytics).await.map(|_| ())
    }

    fn is_loaded(&self) -> bool {
        self.runtime.is_ready()
    }

    async fn handle(&self, event: &Event) -> Result<DispatchReport, PluginError> {
        self.dispatch(event).await
    }
}

/// Route an event to the lifecycle method matching its type.
pub async fn deliver<P: Plugin>(plugin: &P, event: &Event) -> Result<Event, PluginError> {
    match event.kind() {
        EventType::Track => plugin.track(event).await,
        EventType::Page => plugin.page(event).await,
        EventType::Identify => plugin.identify(event).await,
        EventType::Group => plugin.group(event).await,
        EventType::Alias => plugin.alias(event).await,
    }
}
