//! Script loading contract.
//!
//! Destinations that depend on an external SDK ask the host to load it during
//! initialization. The runtime only owns the contract; hosts supply the
//! implementation.

use crate::error::BoxError;
use std::{collections::BTreeMap, future::Future, pin::Pin};

/// Extra attributes for a script load (`nonce`, `crossorigin`, ...).
pub type ScriptAttributes = BTreeMap<String, String>;

/// A loaded script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandle {
    /// The URL the script was loaded from.
    pub url: String,
    /// The attributes it was loaded with.
    pub attributes: ScriptAttributes,
}

impl ScriptHandle {
    /// Create a handle for a script loaded from `url`.
    pub fn new(url: impl Into<String>, attributes: ScriptAttributes) -> Self {
        Self {
            url: url.into(),
            attributes,
        }
    }
}

/// Loads external scripts on behalf of destinations.
pub trait ScriptLoader: Send + Sync + 'static {
    /// Load the script at `url`, resolving once it has executed.
    fn load_script<'a>(
        &'a self,
        url: &'a str,
        attributes: &'a ScriptAttributes,
    ) -> Pin<Box<dyn Future<Output = Result<ScriptHandle, BoxError>> + Send + 'a>>;
}
