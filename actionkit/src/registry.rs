//! Plugin registry.
//!
//! The registry is the host-side pipeline: it orders plugins by stage and runs
//! them for every event.
//!
//! - `before` and `enrichment` plugins run one after another, each receiving
//!   the event as updated by the previous one.
//! - `destination` plugins then run concurrently on the resulting event.
//!
//! A plugin that fails (not loaded, or its destination failed to initialize)
//! is reported and skipped; its siblings are unaffected.

use crate::{
    destination::AnalyticsContext,
    error::ConfigError,
    plugin::{DispatchReport, DynPlugin, Plugin},
};
use actionkit_core::{Event, LifecycleHook, PluginError};
use futures::future::join_all;
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::warn;

/// Shared switch deciding whether the pipeline passes events to a plugin.
///
/// Clones observe the same switch. Flipping it takes effect from the next
/// [`PluginRegistry::dispatch`]; a dispatch already in flight is unaffected.
#[derive(Clone, Debug)]
pub struct EnabledHandle {
    running: Arc<AtomicBool>,
}

impl EnabledHandle {
    pub(crate) fn new(running: bool) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(running)),
        }
    }

    /// `true` while the pipeline delivers events to the plugin.
    pub fn is_enabled(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Resume delivering events.
    pub fn enable(&self) {
        self.set(true);
    }

    /// Stop delivering events. The plugin stays loaded.
    pub fn disable(&self) {
        self.set(false);
    }

    /// Switch delivery on if it was off and off if it was on. Returns `true`
    /// when the plugin is now enabled.
    pub fn toggle(&self) -> bool {
        let was_running = self.running.fetch_xor(true, Ordering::AcqRel);
        !was_running
    }

    fn set(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

/// A registered plugin and its enabled state.
pub struct PluginEntry {
    plugin: Box<dyn DynPlugin>,
    enabled: EnabledHandle,
}

impl PluginEntry {
    /// The plugin.
    pub fn plugin(&self) -> &dyn DynPlugin {
        &*self.plugin
    }

    /// Whether the plugin currently runs.
    pub fn is_enabled(&self) -> bool {
        self.enabled.is_enabled()
    }

    /// A handle for toggling the plugin.
    pub fn enabled_handle(&self) -> EnabledHandle {
        self.enabled.clone()
    }
}

/// The outcome of one plugin for one event.
#[derive(Debug)]
pub struct PluginOutcome {
    /// The plugin name.
    pub plugin: String,
    /// The plugin's report, or why it could not run.
    pub result: Result<DispatchReport, PluginError>,
}

/// What happened to one event across the pipeline.
#[derive(Debug)]
pub struct PipelineReport {
    /// The event after the `before` and `enrichment` stages.
    pub event: Event,
    /// One outcome per enabled plugin, in pipeline order.
    pub outcomes: Vec<PluginOutcome>,
}

impl PipelineReport {
    /// The outcome of a plugin by name.
    pub fn outcome(&self, plugin: &str) -> Option<&PluginOutcome> {
        self.outcomes.iter().find(|o| o.plugin == plugin)
    }
}

// ============================================================================
// PluginRegistryBuilder
// ============================================================================

/// Builder for a [`PluginRegistry`].
///
/// # Example
/// ```ignore
/// let registry = PluginRegistryBuilder::new()
///     .register_all(DestinationLoader::new(Braze, scripts).settings(settings).build()?)
///     .register_with_enabled(consent_plugin, false)
///     .build()?;
/// ```
#[derive(Default)]
pub struct PluginRegistryBuilder {
    entries: Vec<PluginEntry>,
}

impl PluginRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enabled plugin.
    pub fn register<P: Plugin>(self, plugin: P) -> Self {
        self.register_with_enabled(plugin, true)
    }

    /// Register a plugin with an initial enabled state.
    pub fn register_with_enabled<P: Plugin>(mut self, plugin: P, enabled: bool) -> Self {
        self.entries.push(PluginEntry {
            plugin: Box::new(plugin),
            enabled: EnabledHandle::new(enabled),
        });
        self
    }

    /// Register every plugin of an iterator.
    pub fn register_all<P, I>(self, plugins: I) -> Self
    where
        P: Plugin,
        I: IntoIterator<Item = P>,
    {
        plugins.into_iter().fold(self, Self::register)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the registry, ordering plugins by stage.
    ///
    /// Registration order is kept within a stage. Fails if two plugins share
    /// a name.
    pub fn build(mut self) -> Result<PluginRegistry, ConfigError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.plugin.name()) {
                return Err(ConfigError::DuplicatePlugin(entry.plugin.name().to_string()));
            }
        }
        self.entries.sort_by_key(|e| e.plugin.plugin_type());
        Ok(PluginRegistry {
            entries: self.entries,
        })
    }
}

// ============================================================================
// PluginRegistry
// ============================================================================

/// An ordered, immutable set of plugins.
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
}

impl PluginRegistry {
    /// All entries in pipeline order.
    pub fn entries(&self) -> &[PluginEntry] {
        &self.entries
    }

    /// Look up a plugin entry by name.
    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|e| e.plugin.name() == name)
    }

    /// A handle for toggling the named plugin.
    pub fn enabled_handle(&self, name: &str) -> Option<EnabledHandle> {
        self.get(name).map(PluginEntry::enabled_handle)
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every plugin concurrently.
    ///
    /// Returns one result per plugin, in pipeline order. A failure only
    /// affects the plugins of the failing destination.
    pub async fn load(&self, analytics: &AnalyticsContext) -> Vec<(String, Result<(), PluginError>)> {
        let loads = self.entries.iter().map(|entry| async move {
            let result = entry.plugin.load_dyn(analytics).await;
            if let Err(err) = &result {
                warn!(plugin = entry.plugin.name(), error = %err, "plugin failed to load");
            }
            (entry.plugin.name().to_string(), result)
        });
        join_all(loads).await
    }

    /// Run an event through the pipeline.
    pub async fn dispatch(&self, event: Event) -> PipelineReport {
        let mut event = event;
        let mut outcomes = Vec::new();

        let (sequential, concurrent): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .filter(|entry| entry.is_enabled())
            .partition(|entry| entry.plugin.plugin_type() != LifecycleHook::Destination);

        for entry in sequential {
            let result = entry.plugin.handle_dyn(&event).await;
            match &result {
                Ok(report) => event = report.event.clone(),
                Err(err) => warn!(plugin = entry.plugin.name(), error = %err, "plugin skipped"),
            }
            outcomes.push(PluginOutcome {
                plugin: entry.plugin.name().to_string(),
                result,
            });
        }

        let event_ref = &event;
        let deliveries = concurrent.into_iter().map(|entry| async move {
            let result = entry.plugin.handle_dyn(event_ref).await;
            if let Err(err) = &result {
                warn!(plugin = entry.plugin.name(), error = %err, "plugin skipped");
            }
            PluginOutcome {
                plugin: entry.plugin.name().to_string(),
                result,
            }
        });
        outcomes.extend(join_all(deliveries).await);

        PipelineReport { event, outcomes }
    }
}
