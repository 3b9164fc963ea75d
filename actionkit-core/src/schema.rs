//! Action field schemas.
//!
//! Every action declares the fields its `perform` callback expects. The
//! schema serves two purposes: its defaults produce the action's default
//! mapping at configuration time, and the mapped payload is validated against
//! it before each invocation.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The JSON type of an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A string.
    String,
    /// Any number.
    Number,
    /// An integral number.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// A JSON object.
    Object,
    /// A date-time string.
    Datetime,
}

impl FieldType {
    /// Human readable name, used in error messages.
    pub const fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "a string",
            FieldType::Number => "a number",
            FieldType::Integer => "an integer",
            FieldType::Boolean => "a boolean",
            FieldType::Object => "an object",
            FieldType::Datetime => "a datetime string",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String | FieldType::Datetime => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
        }
    }
}

/// The JSON type name of a value, with an indefinite article.
pub fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A single field accepted by an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    /// Short label shown in configuration UIs.
    pub label: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The JSON type of the field.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the payload must contain this field.
    #[serde(default)]
    pub required: bool,
    /// Whether the field holds an array of `field_type` values.
    #[serde(default)]
    pub multiple: bool,
    /// Default mapping for this field (usually a `@path` directive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl InputField {
    /// Create an optional, single-valued field.
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            label: label.into(),
            description: None,
            field_type,
            required: false,
            multiple: false,
            default: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as an array of values.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Set the default mapping.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), SchemaError> {
        let wrong_type = |expected: &'static str, found: &Value| SchemaError::WrongType {
            field: name.to_string(),
            expected,
            found: describe_value(found),
        };

        if self.multiple {
            let items = value
                .as_array()
                .ok_or_else(|| wrong_type("an array", value))?;
            return match items.iter().find(|item| !self.field_type.accepts(item)) {
                Some(item) => Err(wrong_type(self.field_type.describe(), item)),
                None => Ok(()),
            };
        }

        if self.field_type.accepts(value) {
            Ok(())
        } else {
            Err(wrong_type(self.field_type.describe(), value))
        }
    }
}

/// The ordered set of fields accepted by an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    fields: Vec<(String, InputField)>,
}

impl FieldSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any earlier field with the same name.
    pub fn field(mut self, name: impl Into<String>, field: InputField) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&InputField> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, field)| field)
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The mapping built from every field's default.
    pub fn default_mapping(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, field)| field.default.clone().map(|value| (name.clone(), value)))
            .collect()
    }

    /// Validate a mapped payload.
    ///
    /// Null is treated like absence. Fields not declared in the schema are
    /// allowed and left untouched.
    pub fn validate(&self, payload: &Value) -> Result<(), SchemaError> {
        let object = payload
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(describe_value(payload)))?;

        for (name, field) in &self.fields {
            match object.get(name) {
                None | Some(Value::Null) if field.required => {
                    return Err(SchemaError::MissingField(name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) => field.check(name, value)?,
            }
        }
        Ok(())
    }
}
