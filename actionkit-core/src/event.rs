//! Analytics events.
//!
//! An [`Event`] is a JSON object carrying a `type` discriminant
//! ([`EventType`]) plus type-dependent fields (`event`, `name`, `properties`,
//! `traits`, `userId`, `anonymousId`, `groupId`, `context`, `integrations`).
//!
//! The discriminant is fixed once the event is built. Every other field can be
//! patched with [`Event::update`], which merges into nested objects without
//! dropping sibling keys.

use crate::{error::EventError, path::FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// The kind of an analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A user action (`event` carries its name).
    Track,
    /// A user identity and its traits.
    Identify,
    /// A page view.
    Page,
    /// Membership of a user in a group.
    Group,
    /// An identity merge.
    Alias,
}

impl EventType {
    /// The wire name of this event type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Track => "track",
            EventType::Identify => "identify",
            EventType::Page => "page",
            EventType::Group => "group",
            EventType::Alias => "alias",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(EventType::Track),
            "identify" => Ok(EventType::Identify),
            "page" => Ok(EventType::Page),
            "group" => Ok(EventType::Group),
            "alias" => Ok(EventType::Alias),
            other => Err(EventError::UnknownType(other.to_string())),
        }
    }
}

/// An analytics event.
///
/// # Example
///
/// ```rust
/// use actionkit_core::{Event, EventType};
/// use serde_json::json;
///
/// let event = Event::track("Order Completed")
///     .with_user_id("u-1")
///     .with_property("total", json!(42));
///
/// assert_eq!(event.kind(), EventType::Track);
/// assert_eq!(event.get("properties.total"), Some(&json!(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Event {
    kind: EventType,
    fields: Map<String, Value>,
}

impl Event {
    /// Create an empty event of the given type.
    pub fn new(kind: EventType) -> Self {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::String(kind.as_str().into()));
        Self { kind, fields }
    }

    /// Create a `track` event with the given event name.
    pub fn track(event: impl Into<String>) -> Self {
        Self::new(EventType::Track).with_field("event", Value::String(event.into()))
    }

    /// Create an `identify` event for the given user.
    pub fn identify(user_id: impl Into<String>) -> Self {
        Self::new(EventType::Identify).with_user_id(user_id)
    }

    /// Create a `page` event with the given page name.
    pub fn page(name: impl Into<String>) -> Self {
        Self::new(EventType::Page).with_field("name", Value::String(name.into()))
    }

    /// Create a `group` event for the given group.
    pub fn group(group_id: impl Into<String>) -> Self {
        Self::new(EventType::Group).with_field("groupId", Value::String(group_id.into()))
    }

    /// Create an `alias` event merging `previous_id` into `user_id`.
    pub fn alias(user_id: impl Into<String>, previous_id: impl Into<String>) -> Self {
        Self::new(EventType::Alias)
            .with_user_id(user_id)
            .with_field("previousId", Value::String(previous_id.into()))
    }

    /// Set a top-level field. The `type` discriminant cannot be replaced.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "type" {
            self.fields.insert(key, value);
        }
        self
    }

    /// Set `userId`.
    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        self.with_field("userId", Value::String(user_id.into()))
    }

    /// Set `anonymousId`.
    pub fn with_anonymous_id(self, anonymous_id: impl Into<String>) -> Self {
        self.with_field("anonymousId", Value::String(anonymous_id.into()))
    }

    /// Set one entry of `properties`.
    pub fn with_property(self, key: impl Into<String>, value: Value) -> Self {
        self.with_nested("properties", key.into(), value)
    }

    /// Set one entry of `traits`.
    pub fn with_trait(self, key: impl Into<String>, value: Value) -> Self {
        self.with_nested("traits", key.into(), value)
    }

    /// Set one entry of `context`.
    pub fn with_context(self, key: impl Into<String>, value: Value) -> Self {
        self.with_nested("context", key.into(), value)
    }

    fn with_nested(mut self, container: &str, key: String, value: Value) -> Self {
        let slot = self
            .fields
            .entry(container)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(map) = slot {
            map.insert(key, value);
        }
        self
    }

    /// The event type.
    pub fn kind(&self) -> EventType {
        self.kind
    }

    /// The event name: `event` for track calls, `name` for page calls.
    pub fn name(&self) -> Option<&str> {
        let key = match self.kind {
            EventType::Track => "event",
            _ => "name",
        };
        self.fields.get(key).and_then(Value::as_str)
    }

    /// `userId`, if present.
    pub fn user_id(&self) -> Option<&str> {
        self.fields.get("userId").and_then(Value::as_str)
    }

    /// `anonymousId`, if present.
    pub fn anonymous_id(&self) -> Option<&str> {
        self.fields.get("anonymousId").and_then(Value::as_str)
    }

    /// `properties`, if present.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.fields.get("properties").and_then(Value::as_object)
    }

    /// `traits`, if present.
    pub fn traits(&self) -> Option<&Map<String, Value>> {
        self.fields.get("traits").and_then(Value::as_object)
    }

    /// The `integrations` map, if present.
    pub fn integrations(&self) -> Option<&Map<String, Value>> {
        self.fields.get("integrations").and_then(Value::as_object)
    }

    /// All fields of the event, including `type`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a dotted path such as `properties.price`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.resolve(&FieldPath::parse(path))
    }

    /// Look up a pre-parsed path.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Value> {
        path.resolve_in(&self.fields)
    }

    /// Patch the value at a dotted path.
    ///
    /// Missing intermediate objects are created. When both the existing and the
    /// new value are objects they are merged recursively, so sibling keys
    /// survive (`integrations.Braze` can be updated without touching
    /// `integrations.Amplitude`).
    pub fn update(&mut self, path: &str, value: Value) -> Result<(), EventError> {
        let path = FieldPath::parse(path);
        let (last, parents) = path.segments().split_last().ok_or(EventError::EmptyPath)?;
        if parents.is_empty() && last == "type" {
            return Err(EventError::ImmutableField(last.clone()));
        }

        let mut container = &mut self.fields;
        for segment in parents {
            let slot = container
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            container = match slot {
                Value::Object(map) => map,
                _ => {
                    return Err(EventError::NotAContainer {
                        path: path.to_string(),
                        segment: segment.clone(),
                    });
                }
            };
        }

        match container.get_mut(last) {
            Some(existing) => merge(existing, value),
            None => {
                container.insert(last.clone(), value);
            }
        }
        Ok(())
    }

    /// Convert the event into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, patch) => *slot = patch,
    }
}

impl TryFrom<Value> for Event {
    type Error = EventError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(EventError::NotAnObject);
        };
        let kind = match fields.get("type") {
            Some(Value::String(kind)) => kind.parse()?,
            Some(other) => return Err(EventError::UnknownType(other.to_string())),
            None => return Err(EventError::MissingType),
        };
        Ok(Self { kind, fields })
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        Value::Object(event.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_constructors_set_discriminant() {
        let event = Event::track("Order Completed");
        assert_eq!(event.kind(), EventType::Track);
        assert_eq!(event.name(), Some("Order Completed"));
        assert_eq!(event.get("type"), Some(&json!("track")));

        let page = Event::page("Home");
        assert_eq!(page.name(), Some("Home"));

        let alias = Event::alias("u-2", "u-1");
        assert_eq!(alias.user_id(), Some("u-2"));
        assert_eq!(alias.get("previousId"), Some(&json!("u-1")));
    }

    #[test]
    fn test_with_field_keeps_type() {
        let event = Event::identify("u-1").with_field("type", json!("track"));
        assert_eq!(event.kind(), EventType::Identify);
        assert_eq!(event.get("type"), Some(&json!("identify")));
    }

    #[test]
    fn test_try_from_value() {
        let event = Event::try_from(json!({ "type": "group", "groupId": "g-1" })).unwrap();
        assert_eq!(event.kind(), EventType::Group);

        assert_eq!(
            Event::try_from(json!({ "event": "x" })),
            Err(EventError::MissingType)
        );
        assert_eq!(
            Event::try_from(json!({ "type": "screen" })),
            Err(EventError::UnknownType("screen".into()))
        );
        assert_eq!(Event::try_from(json!([1])), Err(EventError::NotAnObject));
    }

    #[test]
    fn test_serde_round_trip_shape() {
        let event = Event::track("Signed Up").with_property("plan", json!("pro"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({ "type": "track", "event": "Signed Up", "properties": { "plan": "pro" } })
        );
        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_update_merges_without_losing_siblings() {
        let mut event = Event::track("x").with_field(
            "integrations",
            json!({ "Amplitude": { "session_id": 1 }, "Braze": { "enabled": true } }),
        );

        event
            .update("integrations.Braze", json!({ "userId": "u-1" }))
            .unwrap();

        assert_eq!(
            event.integrations().cloned().map(Value::Object),
            Some(json!({
                "Amplitude": { "session_id": 1 },
                "Braze": { "enabled": true, "userId": "u-1" }
            }))
        );
    }

    #[test]
    fn test_update_creates_intermediate_objects() {
        let mut event = Event::identify("u-1");
        event.update("context.device.id", json!("d-1")).unwrap();
        assert_eq!(event.get("context.device.id"), Some(&json!("d-1")));
    }

    #[test]
    fn test_update_rejects_type_and_scalar_parents() {
        let mut event = Event::track("x").with_property("price", json!(5));
        assert_eq!(
            event.update("type", json!("identify")),
            Err(EventError::ImmutableField("type".into()))
        );
        assert!(matches!(
            event.update("properties.price.currency", json!("USD")),
            Err(EventError::NotAContainer { .. })
        ));
        assert_eq!(event.update("", json!(1)), Err(EventError::EmptyPath));
    }

    #[test]
    fn test_update_replaces_scalars() {
        let mut event = Event::track("x").with_property("price", json!(5));
        event.update("properties.price", json!(7)).unwrap();
        assert_eq!(event.get("properties.price"), Some(&json!(7)));
    }
}
