//! Subscription records.
//!
//! A subscription binds one action of a destination to a query deciding
//! whether it runs and a mapping shaping its payload:
//!
//! ```json
//! {
//!   "partnerAction": "trackEvent",
//!   "name": "Track Orders",
//!   "enabled": true,
//!   "subscribe": "type = \"track\" and event = \"Order Completed\"",
//!   "mapping": { "eventName": { "@path": "$.event" } }
//! }
//! ```

use crate::error::ConfigError;
use actionkit_core::Event;
use actionkit_std::{mapping::Mapping, query::Query};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn enabled_by_default() -> bool {
    true
}

/// A subscription as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Key of the action this subscription is bound to.
    pub partner_action: String,
    /// Display name.
    pub name: String,
    /// Disabled subscriptions are validated but never run.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// The query deciding whether the action runs for an event.
    pub subscribe: String,
    /// The mapping building the action's payload.
    #[serde(default)]
    pub mapping: Map<String, Value>,
}

impl Subscription {
    /// Create an enabled subscription with an empty mapping.
    pub fn new(
        partner_action: impl Into<String>,
        name: impl Into<String>,
        subscribe: impl Into<String>,
    ) -> Self {
        Self {
            partner_action: partner_action.into(),
            name: name.into(),
            enabled: true,
            subscribe: subscribe.into(),
            mapping: Map::new(),
        }
    }

    /// Set the mapping.
    pub fn with_mapping(mut self, mapping: Map<String, Value>) -> Self {
        self.mapping = mapping;
        self
    }

    /// Set whether the subscription is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Parse a JSON array of subscription records.
    pub fn from_json_list(records: Value) -> Result<Vec<Self>, ConfigError> {
        serde_json::from_value(records).map_err(ConfigError::Subscription)
    }

    /// Validate the query and mapping.
    pub fn compile(&self) -> Result<CompiledSubscription, ConfigError> {
        let query = Query::parse(&self.subscribe).map_err(|source| ConfigError::Query {
            subscription: self.name.clone(),
            source,
        })?;
        let raw_mapping = Value::Object(self.mapping.clone());
        let mapping = Mapping::compile(&raw_mapping).map_err(|source| ConfigError::Mapping {
            subscription: self.name.clone(),
            source,
        })?;
        Ok(CompiledSubscription {
            name: self.name.clone(),
            partner_action: self.partner_action.clone(),
            enabled: self.enabled,
            query,
            mapping,
            raw_mapping,
        })
    }
}

/// A validated subscription, ready to be matched against events.
#[derive(Debug, Clone)]
pub struct CompiledSubscription {
    name: String,
    partner_action: String,
    enabled: bool,
    query: Query,
    mapping: Mapping,
    raw_mapping: Value,
}

impl CompiledSubscription {
    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the bound action.
    pub fn partner_action(&self) -> &str {
        &self.partner_action
    }

    /// Whether the subscription runs at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The compiled query.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The mapping as it was configured.
    pub fn raw_mapping(&self) -> &Value {
        &self.raw_mapping
    }

    /// Whether this subscription should run for `event`.
    pub fn matches(&self, event: &Event) -> bool {
        self.enabled && self.query.matches(event)
    }

    /// Build the payload for an event, given the event as JSON.
    pub fn payload(&self, source: &Value) -> Value {
        self.mapping.apply(source)
    }
}
