//! Per-destination runtime state.

use crate::destination::{AnalyticsContext, Dependencies, Destination, InitContext};
use actionkit_core::{BoxError, PluginError, SharedError};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

/// Long-lived state of one loaded destination.
///
/// Holds the typed settings and the client produced by `initialize`. The
/// client is created at most once: the first caller of
/// [`initialize`](Self::initialize) starts the attempt on its own task, every
/// caller waits for that same attempt, and a failed attempt is kept and
/// reported to every later caller. Dropping a waiting caller does not cancel
/// the attempt.
pub struct DestinationRuntime<D: Destination> {
    destination: D,
    settings: D::Settings,
    deps: Dependencies,
    attempt: OnceLock<Shared<BoxFuture<'static, ()>>>,
    client: OnceLock<Result<D::Client, SharedError>>,
}

impl<D: Destination> DestinationRuntime<D> {
    /// Create an uninitialized runtime.
    pub fn new(destination: D, settings: D::Settings, deps: Dependencies) -> Self {
        Self {
            destination,
            settings,
            deps,
            attempt: OnceLock::new(),
            client: OnceLock::new(),
        }
    }

    /// The destination name.
    pub fn name(&self) -> &str {
        self.destination.name()
    }

    /// The destination.
    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// The typed settings.
    pub fn settings(&self) -> &D::Settings {
        &self.settings
    }

    /// Initialize the destination if that has not happened yet, returning the
    /// shared client.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn initialize(
        self: &Arc<Self>,
        analytics: &AnalyticsContext,
    ) -> Result<&D::Client, PluginError> {
        if let Some(outcome) = self.client.get() {
            return self.check(outcome);
        }

        let attempt = self
            .attempt
            .get_or_init(|| {
                let runtime = Arc::clone(self);
                let analytics = analytics.clone();
                tokio::spawn(async move { runtime.run(&analytics).await })
                    .map(|_| ())
                    .boxed()
                    .shared()
            })
            .clone();
        attempt.await;

        match self.client.get() {
            Some(outcome) => self.check(outcome),
            // the task panicked or its runtime shut down before it settled
            None => Err(PluginError::Initialization {
                destination: self.name().to_string(),
                source: SharedError::from(BoxError::from("initialization did not complete")),
            }),
        }
    }

    async fn run(&self, analytics: &AnalyticsContext) {
        debug!(destination = self.name(), "initializing destination");
        let ctx = InitContext {
            settings: &self.settings,
            analytics,
        };
        let outcome = match self.destination.initialize(ctx, &self.deps).await {
            Ok(client) => {
                info!(destination = self.name(), "destination ready");
                Ok(client)
            }
            Err(err) => {
                error!(destination = self.name(), error = %err, "destination failed to initialize");
                Err(SharedError::from(err))
            }
        };
        let _ = self.client.set(outcome);
    }

    /// The client, once initialization has settled.
    ///
    /// `None` until the first [`initialize`](Self::initialize) attempt finishes.
    pub fn client(&self) -> Option<Result<&D::Client, PluginError>> {
        self.client.get().map(|outcome| self.check(outcome))
    }

    /// Whether initialization has completed successfully.
    pub fn is_ready(&self) -> bool {
        matches!(self.client.get(), Some(Ok(_)))
    }

    fn check<'a>(
        &self,
        outcome: &'a Result<D::Client, SharedError>,
    ) -> Result<&'a D::Client, PluginError> {
        outcome
            .as_ref()
            .map_err(|source| PluginError::Initialization {
                destination: self.name().to_string(),
                source: source.clone(),
            })
    }
}
