//! Registration-time errors.

use actionkit_std::{mapping::MappingError, query::QueryError};
use thiserror::Error;

/// Errors raised while registering a destination and its subscriptions.
///
/// These surface before any event is processed; a malformed subscription is
/// never silently treated as "never matches".
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A subscription names an action the destination does not have.
    #[error("subscription `{subscription}` targets unknown action `{action}` of destination `{destination}`")]
    UnknownAction {
        /// The destination name.
        destination: String,
        /// The subscription name.
        subscription: String,
        /// The unknown action key.
        action: String,
    },

    /// A subscription's `subscribe` query does not parse.
    #[error("subscription `{subscription}` has an invalid query: {source}")]
    Query {
        /// The subscription name.
        subscription: String,
        /// The parse error.
        #[source]
        source: QueryError,
    },

    /// A subscription's mapping is malformed.
    #[error("subscription `{subscription}` has an invalid mapping: {source}")]
    Mapping {
        /// The subscription name.
        subscription: String,
        /// The validation error.
        #[source]
        source: MappingError,
    },

    /// The destination settings do not deserialize into its settings type.
    #[error("invalid settings for destination `{destination}`: {source}")]
    Settings {
        /// The destination name.
        destination: String,
        /// The deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A subscription record is not valid JSON for a subscription.
    #[error("invalid subscription record: {0}")]
    Subscription(#[source] serde_json::Error),

    /// Two plugins share a name.
    #[error("plugin `{0}` is registered more than once")]
    DuplicatePlugin(String),
}
