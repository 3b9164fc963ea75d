//! Error types for actionkit.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`EventError`] - Invalid events or rejected event patches
//! - [`SchemaError`] - Payloads that do not satisfy an action's field schema
//! - [`InvocationError`] - Failure of a single `perform` invocation
//! - [`ReadinessError`] - A readiness wait that never became true
//! - [`PluginError`] - Lifecycle failures surfaced to the embedding pipeline

use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shared error, cloned out to every caller that observes it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building or patching an [`Event`](crate::Event).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event has no `type` discriminant.
    #[error("event is missing its `type` field")]
    MissingType,

    /// The `type` discriminant is not one of the supported event types.
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// The event is not a JSON object.
    #[error("event must be a JSON object")]
    NotAnObject,

    /// A patch tried to overwrite a field that is fixed for the lifetime of the event.
    #[error("field `{0}` cannot be updated")]
    ImmutableField(String),

    /// A patch path walks through a value that is not an object.
    #[error("cannot update `{path}`: `{segment}` is not an object")]
    NotAContainer {
        /// The full path being updated.
        path: String,
        /// The segment holding a non-object value.
        segment: String,
    },

    /// A patch path was empty.
    #[error("update path is empty")]
    EmptyPath,
}

/// Errors raised when a payload does not satisfy an action's field schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The payload produced by the mapping is not an object.
    #[error("payload must be an object but it is {0}")]
    NotAnObject(&'static str),

    /// A required field is absent (or null).
    #[error("payload is missing required field `{0}`")]
    MissingField(String),

    /// A field holds a value of the wrong JSON type.
    #[error("field `{field}` should be {expected} but it is {found}")]
    WrongType {
        /// Name of the offending field.
        field: String,
        /// The declared type.
        expected: &'static str,
        /// The JSON type actually found.
        found: &'static str,
    },
}

/// Errors from a single action invocation.
///
/// These never abort sibling invocations for the same event.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The action's `perform` returned an error.
    #[error("perform failed: {0}")]
    Perform(#[source] BoxError),

    /// The invocation did not settle before its deadline.
    #[error("perform timed out after {0:?}")]
    Timeout(Duration),

    /// The mapped payload did not satisfy the action's field schema.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] SchemaError),
}

impl From<BoxError> for InvocationError {
    fn from(err: BoxError) -> Self {
        InvocationError::Perform(err)
    }
}

/// Errors from waiting on an external side effect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadinessError {
    /// The predicate did not become true within the deadline.
    #[error("condition not met after {0:?}")]
    Timeout(Duration),

    /// The readiness signal was dropped before it fired.
    #[error("readiness signal closed before it fired")]
    Closed,
}

/// Lifecycle errors surfaced to the embedding pipeline.
#[derive(Error, Debug, Clone)]
pub enum PluginError {
    /// Destination-wide initialization failed. Every plugin of the destination
    /// observes the same error.
    #[error("destination `{destination}` failed to initialize: {source}")]
    Initialization {
        /// The destination name.
        destination: String,
        /// The error returned by `initialize`, including any
        /// [`ReadinessError`] it propagated.
        #[source]
        source: SharedError,
    },

    /// A lifecycle call arrived before `load` completed.
    #[error("plugin `{0}` is not loaded")]
    NotLoaded(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_from_box() {
        let err: BoxError = "boom".into();
        let err = InvocationError::from(err);
        assert!(matches!(err, InvocationError::Perform(_)));
        assert_eq!(err.to_string(), "perform failed: boom");
    }

    #[test]
    fn test_initialization_error_is_cloneable() {
        let source: SharedError = Arc::from(BoxError::from("no network"));
        let err = PluginError::Initialization {
            destination: "Braze".into(),
            source,
        };
        let cloned = err.clone();
        assert_eq!(
            cloned.to_string(),
            "destination `Braze` failed to initialize: no network"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = ReadinessError::Timeout(Duration::from_millis(200));
        assert!(err.to_string().contains("200ms"));
    }
}
