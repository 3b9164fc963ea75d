//! # Destinations
//!
//! A destination is the external collaborator the runtime orchestrates: it
//! supplies a typed settings schema, a closed catalog of actions, and an
//! `initialize` callback producing the client shared by every action.
//!
//! ```rust,ignore
//! struct Braze;
//!
//! impl Destination for Braze {
//!     type Settings = BrazeSettings;
//!     type Client = BrazeSdk;
//!
//!     fn name(&self) -> &str { "Braze Web Mode" }
//!
//!     fn catalog(&self) -> Catalog<BrazeSettings, BrazeSdk> {
//!         Catalog::new()
//!             .action("trackEvent", TrackEvent::default())
//!             .action("updateUserProfile", UpdateUserProfile::default())
//!     }
//!
//!     async fn initialize(
//!         &self,
//!         ctx: InitContext<'_, BrazeSettings>,
//!         deps: &Dependencies,
//!     ) -> Result<BrazeSdk, BoxError> {
//!         deps.load_script(&ctx.settings.sdk_url, &ScriptAttributes::new()).await?;
//!         BrazeSdk::connect(&ctx.settings.api_key).await
//!     }
//! }
//! ```

use crate::{catalog::Catalog, config::RuntimeConfig};
use actionkit_core::{
    BoxError, ReadinessError, ScriptAttributes, ScriptHandle, ScriptLoader,
};
use actionkit_std::readiness::{ReadyWaiter, resolve_when};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{future::Future, sync::Arc, time::Duration};

/// Host information handed to `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsContext {
    /// The source write key, if the host has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_key: Option<String>,
    /// Any other host options.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl AnalyticsContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the write key.
    pub fn with_write_key(mut self, write_key: impl Into<String>) -> Self {
        self.write_key = Some(write_key.into());
        self
    }
}

/// What `initialize` receives besides the dependency bundle.
#[derive(Debug)]
pub struct InitContext<'a, S> {
    /// The destination's typed settings.
    pub settings: &'a S,
    /// Host information.
    pub analytics: &'a AnalyticsContext,
}

/// A destination: settings, a catalog of actions, and a one-time initializer.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Destination`",
    label = "missing `Destination` implementation",
    note = "Destinations must implement `name`, `catalog` and `initialize`."
)]
pub trait Destination: Send + Sync + 'static {
    /// Settings, deserialized from configuration JSON at registration.
    type Settings: DeserializeOwned + Send + Sync + 'static;

    /// The handle produced by `initialize` and shared by every action.
    type Client: Send + Sync + 'static;

    /// The destination name, used as the plugin name prefix.
    fn name(&self) -> &str;

    /// The destination's actions. Called once at registration.
    fn catalog(&self) -> Catalog<Self::Settings, Self::Client>;

    /// Build the client. Runs at most once per loaded destination.
    fn initialize(
        &self,
        ctx: InitContext<'_, Self::Settings>,
        deps: &Dependencies,
    ) -> impl Future<Output = Result<Self::Client, BoxError>> + Send;
}

/// The dependency bundle offered to `initialize`.
#[derive(Clone)]
pub struct Dependencies {
    scripts: Arc<dyn ScriptLoader>,
    poll_interval: Duration,
    timeout: Duration,
}

impl Dependencies {
    /// Create a bundle with the default readiness settings.
    pub fn new(scripts: Arc<dyn ScriptLoader>) -> Self {
        Self::with_config(scripts, &RuntimeConfig::default())
    }

    /// Create a bundle using the readiness settings from `config`.
    pub fn with_config(scripts: Arc<dyn ScriptLoader>, config: &RuntimeConfig) -> Self {
        Self {
            scripts,
            poll_interval: config.readiness_poll_interval,
            timeout: config.readiness_timeout,
        }
    }

    /// Load an external script.
    pub async fn load_script(
        &self,
        url: &str,
        attributes: &ScriptAttributes,
    ) -> Result<ScriptHandle, BoxError> {
        self.scripts.load_script(url, attributes).await
    }

    /// Poll `predicate` with the configured interval and deadline.
    pub async fn resolve_when<F>(&self, predicate: F) -> Result<(), ReadinessError>
    where
        F: FnMut() -> bool + Send,
    {
        resolve_when(predicate, self.poll_interval, self.timeout).await
    }

    /// Poll `predicate` every `interval`, failing after `timeout` (or the
    /// configured deadline when `None`).
    pub async fn resolve_when_within<F>(
        &self,
        predicate: F,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<(), ReadinessError>
    where
        F: FnMut() -> bool + Send,
    {
        resolve_when(predicate, interval, timeout.unwrap_or(self.timeout)).await
    }

    /// Wait for a readiness signal with the configured deadline.
    pub async fn wait_ready(&self, waiter: &ReadyWaiter) -> Result<(), ReadinessError> {
        waiter.wait(self.timeout).await
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actionkit_std::{readiness::ready_signal, testing::RecordingScriptLoader};
    use serde_json::json;

    #[test]
    fn test_analytics_context_flattens_options() {
        let ctx: AnalyticsContext =
            serde_json::from_value(json!({ "writeKey": "wk", "cdnURL": "https://cdn" })).unwrap();
        assert_eq!(ctx.write_key.as_deref(), Some("wk"));
        assert_eq!(ctx.options.get("cdnURL"), Some(&json!("https://cdn")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependencies_use_configured_deadline() {
        let loader = RecordingScriptLoader::new();
        let config = RuntimeConfig::new().with_readiness_timeout(Duration::from_millis(40));
        let deps = Dependencies::with_config(Arc::new(loader.clone()), &config);

        deps.load_script("https://cdn.example.com/sdk.js", &ScriptAttributes::new())
            .await
            .unwrap();
        assert_eq!(loader.urls(), vec!["https://cdn.example.com/sdk.js".to_string()]);

        assert_eq!(
            deps.resolve_when(|| false).await,
            Err(ReadinessError::Timeout(Duration::from_millis(40)))
        );
        assert_eq!(
            deps.resolve_when_within(|| false, Duration::from_millis(5), Some(Duration::from_millis(15)))
                .await,
            Err(ReadinessError::Timeout(Duration::from_millis(15)))
        );

        let (signal, waiter) = ready_signal();
        signal.notify();
        assert_eq!(deps.wait_ready(&waiter).await, Ok(()));
    }
}
