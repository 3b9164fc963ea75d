//! Dotted field paths into JSON values.
//!
//! Paths are shared by subscription queries (`properties.price`) and mapping
//! directives (`$.properties.price`). Segments are separated by `.`, keys may
//! contain spaces, and numeric segments index into arrays.

use serde_json::{Map, Value};
use std::fmt;

/// A parsed, dot-separated path.
///
/// An empty path addresses the value it is resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a plain dotted path such as `properties.price`.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self {
            segments: path.split('.').map(str::to_owned).collect(),
        }
    }

    /// Parse a scoped path such as `$.properties.price` or `@.sku`.
    ///
    /// The `$` / `@` prefix is optional; `$`, `$.`, `@` and the empty string
    /// all denote the current scope.
    pub fn parse_scoped(path: &str) -> Self {
        let rest = path
            .strip_prefix('$')
            .or_else(|| path.strip_prefix('@'))
            .unwrap_or(path);
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        Self::parse(rest)
    }

    /// Build a path from pre-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this path addresses the root of its scope.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve this path against a JSON value.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| step(current, segment))
    }

    /// Resolve this path against a JSON object.
    pub fn resolve_in<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let start = root.get(first)?;
        rest.iter()
            .try_fold(start, |current, segment| step(current, segment))
    }
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
