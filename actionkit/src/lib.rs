//! # actionkit - Subscription-Driven Action Runtime
//!
//! `actionkit` routes analytics events to the actions of pluggable
//! destinations. Each destination action is bound to subscriptions: a query
//! deciding whether the action runs for an event, and a mapping shaping the
//! event into the action's payload.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actionkit::prelude::*;
//!
//! let plugins = DestinationLoader::new(MyDestination, Arc::new(scripts))
//!     .settings(json!({ "apiKey": "secret" }))
//!     .subscription(
//!         Subscription::new("trackEvent", "Orders", r#"type = "track" and event = "Order Completed""#)
//!             .with_mapping(mapping),
//!     )
//!     .build()?;
//!
//! let registry = PluginRegistryBuilder::new().register_all(plugins).build()?;
//! registry.load(&AnalyticsContext::new()).await;
//! let report = registry.dispatch(Event::track("Order Completed")).await;
//! ```
//!
//! ## Layers
//!
//! - [`actionkit_core`]: events, actions, field schemas, error types
//! - [`actionkit_std`]: the query language, the mapping engine, readiness waiters
//! - this crate: destinations, subscriptions, plugins and the plugin registry
//!
//! ## Logging
//!
//! Everything is reported through `tracing`. Each invocation runs inside a
//! `perform` span carrying the destination, action and subscription names;
//! isolated invocation failures are `warn!` events and initialization
//! failures are `error!` events.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod destination;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod registry;
pub mod runtime;
pub mod subscription;

pub use actionkit_core;
pub use actionkit_std;

pub use actionkit_core::{
    Action, ActionDefinition, BoxError, DynAction, Event, EventError, EventType, FieldSchema,
    FieldType, InputField, InvocationError, LifecycleHook, PerformInput, PluginError,
    ReadinessError, SchemaError, ScriptAttributes, ScriptHandle, ScriptLoader,
};
pub use catalog::Catalog;
pub use config::RuntimeConfig;
pub use destination::{AnalyticsContext, Dependencies, Destination, InitContext};
pub use error::ConfigError;
pub use loader::DestinationLoader;
pub use plugin::{ActionPlugin, DispatchReport, DynPlugin, InvocationOutcome, Plugin, deliver};
pub use registry::{
    EnabledHandle, PipelineReport, PluginEntry, PluginOutcome, PluginRegistry,
    PluginRegistryBuilder,
};
pub use runtime::DestinationRuntime;
pub use subscription::{CompiledSubscription, Subscription};

/// Everything needed to write and load a destination.
pub mod prelude {
    pub use crate::{
        Action, ActionDefinition, AnalyticsContext, BoxError, Catalog, Dependencies, Destination,
        DestinationLoader, Event, EventType, FieldSchema, FieldType, InitContext, InputField,
        LifecycleHook, PerformInput, Plugin, PluginRegistry, PluginRegistryBuilder,
        RuntimeConfig, ScriptAttributes, Subscription,
    };
}
