//! Closed catalogs of actions.

use crate::subscription::Subscription;
use actionkit_core::{Action, DynAction};
use std::sync::Arc;

/// The ordered set of actions a destination offers, keyed by action key.
pub struct Catalog<S, C> {
    actions: Vec<(String, Arc<dyn DynAction<S, C>>)>,
}

impl<S, C> Catalog<S, C>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Add an action under `key`, replacing any earlier action with that key.
    pub fn action<A: Action<S, C>>(mut self, key: impl Into<String>, action: A) -> Self {
        let key = key.into();
        let action: Arc<dyn DynAction<S, C>> = Arc::new(action);
        match self.actions.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = action,
            None => self.actions.push((key, action)),
        }
        self
    }

    /// Look up an action by key.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn DynAction<S, C>>> {
        self.actions
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, action)| action)
    }

    /// Iterate actions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn DynAction<S, C>>)> {
        self.actions.iter().map(|(key, action)| (key.as_str(), action))
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Preset subscriptions: one per action with a default subscription,
    /// mapped with the defaults of its field schema.
    pub fn presets(&self) -> Vec<Subscription> {
        self.actions
            .iter()
            .filter_map(|(key, action)| {
                let definition = action.definition();
                let subscribe = definition.default_subscription.as_ref()?;
                Some(
                    Subscription::new(key.clone(), definition.title.clone(), subscribe.clone())
                        .with_mapping(definition.fields.default_mapping()),
                )
            })
            .collect()
    }
}

impl<S, C> Default for Catalog<S, C>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actionkit_core::{ActionDefinition, FieldSchema, FieldType, InputField};
    use actionkit_std::testing::{FailingAction, RecordingAction};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn track_event() -> RecordingAction {
        RecordingAction::with_definition(
            ActionDefinition::new("Track Event")
                .with_default_subscription(r#"type = "track""#)
                .with_fields(FieldSchema::new().field(
                    "eventName",
                    InputField::new("Event Name", FieldType::String)
                        .with_default(json!({ "@path": "$.event" })),
                )),
        )
    }

    #[test]
    fn test_presets_use_defaults() {
        let catalog: Catalog<(), ()> = Catalog::new()
            .action("trackEvent", track_event())
            .action("noPreset", FailingAction::new("No Preset", "x"));

        let presets = catalog.presets();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].partner_action, "trackEvent");
        assert_eq!(presets[0].name, "Track Event");
        assert_eq!(presets[0].subscribe, r#"type = "track""#);
        assert_eq!(
            serde_json::Value::Object(presets[0].mapping.clone()),
            json!({ "eventName": { "@path": "$.event" } })
        );
        assert!(presets[0].compile().is_ok());
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let catalog: Catalog<(), ()> = Catalog::new()
            .action("a", RecordingAction::new("First"))
            .action("b", RecordingAction::new("B"))
            .action("a", RecordingAction::new("Second"));

        let keys: Vec<&str> = catalog.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(catalog.get("a").map(|a| a.definition().title.clone()), Some("Second".into()));
    }
}
