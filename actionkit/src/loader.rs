//! Turning a destination and its configuration into plugins.

use crate::{
    config::RuntimeConfig,
    destination::{Dependencies, Destination},
    error::ConfigError,
    plugin::ActionPlugin,
    runtime::DestinationRuntime,
    subscription::{CompiledSubscription, Subscription},
};
use actionkit_core::ScriptLoader;
use serde_json::Value;
use std::sync::Arc;

/// Builder that validates a destination's configuration and produces one
/// [`ActionPlugin`] per action.
///
/// Every configuration problem (settings that do not deserialize, a query
/// that does not parse, a malformed mapping, an unknown action key) is
/// reported by [`build`](Self::build), before any event is processed.
///
/// # Example
/// ```ignore
/// let plugins = DestinationLoader::new(Braze, Arc::new(BrowserScripts))
///     .settings(json!({ "api_key": "..." }))
///     .subscriptions(Subscription::from_json_list(records)?)
///     .config(RuntimeConfig::new().with_perform_timeout(Some(Duration::from_secs(5))))
///     .build()?;
/// ```
pub struct DestinationLoader<D: Destination> {
    destination: D,
    scripts: Arc<dyn ScriptLoader>,
    settings: Value,
    subscriptions: Vec<Subscription>,
    config: RuntimeConfig,
    presets: bool,
}

impl<D: Destination> DestinationLoader<D> {
    /// Start loading `destination`, loading scripts through `scripts`.
    pub fn new(destination: D, scripts: Arc<dyn ScriptLoader>) -> Self {
        Self {
            destination,
            scripts,
            settings: Value::Object(Default::default()),
            subscriptions: Vec::new(),
            config: RuntimeConfig::default(),
            presets: false,
        }
    }

    /// Set the raw destination settings.
    pub fn settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    /// Add one subscription.
    pub fn subscription(mut self, subscription: Subscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Add several subscriptions.
    pub fn subscriptions(mut self, subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        self.subscriptions.extend(subscriptions);
        self
    }

    /// Also subscribe every action that declares a preset, after the
    /// explicit subscriptions.
    pub fn with_presets(mut self) -> Self {
        self.presets = true;
        self
    }

    /// Set the runtime configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate everything and build the plugins, in catalog order.
    pub fn build(self) -> Result<Vec<ActionPlugin<D>>, ConfigError> {
        let name = self.destination.name().to_string();
        let settings: D::Settings =
            serde_json::from_value(self.settings).map_err(|source| ConfigError::Settings {
                destination: name.clone(),
                source,
            })?;

        let catalog = self.destination.catalog();
        let mut subscriptions = self.subscriptions;
        if self.presets {
            subscriptions.extend(catalog.presets());
        }

        let compiled = subscriptions
            .iter()
            .map(|subscription| {
                if catalog.get(&subscription.partner_action).is_none() {
                    return Err(ConfigError::UnknownAction {
                        destination: name.clone(),
                        subscription: subscription.name.clone(),
                        action: subscription.partner_action.clone(),
                    });
                }
                subscription.compile()
            })
            .collect::<Result<Vec<CompiledSubscription>, _>>()?;

        let deps = Dependencies::with_config(self.scripts, &self.config);
        let runtime = Arc::new(DestinationRuntime::new(self.destination, settings, deps));

        let plugins = catalog
            .iter()
            .map(|(key, action)| {
                let bound = compiled
                    .iter()
                    .filter(|s| s.partner_action() == key)
                    .cloned()
                    .collect();
                ActionPlugin::new(
                    key.to_string(),
                    Arc::clone(action),
                    Arc::clone(&runtime),
                    bound,
                    self.config.perform_timeout,
                )
            })
            .collect();
        Ok(plugins)
    }
}
