//! Declarative mapping (transform) engine.
//!
//! A mapping is plain JSON in which some objects are *directives*, recognized
//! purely by their `@`-prefixed key:
//!
//! | Directive | Operand | Result |
//! |-----------|---------|--------|
//! | `@path` | `"$.a.b"` or a directive producing a path | the value at the path |
//! | `@if` | `{exists \| blank, then?, else?}` | the selected branch |
//! | `@arrayPath` | `[source, template?]` | the template applied to every element |
//! | `@template` | `"Hi {{name}}"` | the interpolated string |
//! | `@literal` | any mapping | its operand |
//!
//! Everything else is walked recursively. A key whose value is undefined (a
//! missing path, an `@if` with no matching branch) is omitted from its object;
//! a literal `null` is kept. Array positions that evaluate to undefined become
//! `null`.
//!
//! Paths resolve against the current scope. At the top level the scope is the
//! input; inside an `@arrayPath` template it is the current element, so
//! `$.sku` there reads the element's `sku`. `$`, `$.` and the empty path
//! denote the scope itself.
//!
//! Mappings are validated once by [`Mapping::compile`]; evaluation never fails.
//!
//! ```rust
//! use actionkit_std::mapping::Mapping;
//! use serde_json::json;
//!
//! let mapping = Mapping::compile(&json!({
//!     "items": { "@arrayPath": ["$.products", { "id": { "@path": "$.sku" } }] },
//!     "coupon": { "@path": "$.coupon" }
//! }))
//! .unwrap();
//!
//! let payload = mapping.apply(&json!({ "products": [{ "sku": "A" }, { "sku": "B" }] }));
//! assert_eq!(payload, json!({ "items": [{ "id": "A" }, { "id": "B" }] }));
//! ```

mod compile;
mod eval;
mod template;


use actionkit_core::describe_value;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One structural problem in a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingIssue {
    /// Slash-separated location of the offending node, such as `/items/@arrayPath`.
    pub location: String,
    /// What is wrong with it.
    pub message: String,
}

impl MappingIssue {
    pub(crate) fn new(location: &str, message: impl Into<String>) -> Self {
        Self {
            location: if location.is_empty() {
                "/".to_string()
            } else {
                location.to_string()
            },
            message: message.into(),
        }
    }
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.location, self.message)
    }
}

/// Errors raised by the mapping engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The mapping is structurally malformed.
    #[error("invalid mapping: {}", render_issues(.0))]
    Invalid(Vec<MappingIssue>),

    /// The input to [`transform`] is not an object.
    #[error("mapping input must be an object but it is {0}")]
    InvalidInput(&'static str),
}

impl MappingError {
    /// The individual structural problems, if any.
    pub fn issues(&self) -> &[MappingIssue] {
        match self {
            MappingError::Invalid(issues) => issues,
            MappingError::InvalidInput(_) => &[],
        }
    }
}

fn render_issues(issues: &[MappingIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Evaluation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// HTML-escape `{{...}}` interpolations in `@template`. Defaults to `true`.
    pub escape_templates: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            escape_templates: true,
        }
    }
}

/// A validated mapping, ready to be applied to any number of inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    root: compile::Node,
    options: TransformOptions,
}

impl Mapping {
    /// Validate a mapping. Every structural problem is reported, not only the first.
    pub fn compile(mapping: &Value) -> Result<Self, MappingError> {
        compile::compile(mapping)
            .map(|root| Self {
                root,
                options: TransformOptions::default(),
            })
            .map_err(MappingError::Invalid)
    }

    /// Replace the evaluation options.
    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluate against an input. `None` means the mapping produced nothing,
    /// which only happens for a top-level directive.
    pub fn evaluate(&self, input: &Value) -> Option<Value> {
        eval::evaluate(&self.root, input, &self.options)
    }

    /// Evaluate against an input, turning an undefined result into `null`.
    pub fn apply(&self, input: &Value) -> Value {
        self.evaluate(input).unwrap_or(Value::Null)
    }
}

/// Compile `mapping` and apply it to `input` in one step.
pub fn transform(mapping: &Value, input: &Value) -> Result<Value, MappingError> {
    if !input.is_object() {
        return Err(MappingError::InvalidInput(describe_value(input)));
    }
    Ok(Mapping::compile(mapping)?.apply(input))
}
