//! # actionkit-core
//!
//! Core data model and traits for the actionkit event routing runtime.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! destination implementations that don't need the full runtime.
//!
//! # Building Blocks
//!
//! - [`Event`] - An analytics event (`track`, `identify`, `page`, `group`, `alias`)
//! - [`FieldPath`] - Dotted paths shared by queries and mappings
//! - [`Action`] - A handler invoked once per matching subscription
//! - [`FieldSchema`] - The fields an action accepts, with defaults and validation
//! - [`ScriptLoader`] - The script loading contract offered to destinations
//!
//! # Error Types
//!
//! - [`EventError`] - Invalid events and rejected patches
//! - [`InvocationError`] - A single failed `perform`
//! - [`PluginError`] - Lifecycle failures surfaced to the host

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod action;
mod error;
mod event;
mod path;
mod schema;
mod script;

// Re-exports
pub use action::{Action, ActionDefinition, DynAction, EventPatch, LifecycleHook, PerformInput};
pub use error::{
    BoxError, EventError, InvocationError, PluginError, ReadinessError, SchemaError, SharedError,
};
pub use event::{Event, EventType};
pub use path::FieldPath;
pub use schema::{FieldSchema, FieldType, InputField, describe_value};
pub use script::{ScriptAttributes, ScriptHandle, ScriptLoader};
