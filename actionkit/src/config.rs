//! Runtime configuration.
//!
//! Durations are written in milliseconds:
//!
//! ```json
//! { "performTimeoutMs": 5000, "readinessPollIntervalMs": 100, "readinessTimeoutMs": 10000 }
//! ```
//!
//! `performTimeoutMs: null` disables the per-invocation deadline. Missing keys
//! take their defaults.

use actionkit_std::readiness::DEFAULT_READINESS_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-invocation deadline.
pub const DEFAULT_PERFORM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default polling interval for readiness waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tunables shared by every destination loaded with this configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deadline for a single `perform` invocation. `None` means no deadline.
    #[serde(rename = "performTimeoutMs", with = "millis_opt")]
    pub perform_timeout: Option<Duration>,
    /// Polling interval used by `Dependencies::resolve_when`.
    #[serde(rename = "readinessPollIntervalMs", with = "millis")]
    pub readiness_poll_interval: Duration,
    /// Deadline used by readiness waits that do not specify one.
    #[serde(rename = "readinessTimeoutMs", with = "millis")]
    pub readiness_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            perform_timeout: Some(DEFAULT_PERFORM_TIMEOUT),
            readiness_poll_interval: DEFAULT_POLL_INTERVAL,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
        }
    }
}

impl RuntimeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-invocation deadline.
    pub fn with_perform_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.perform_timeout = timeout;
        self
    }

    /// Set the readiness polling interval.
    pub fn with_readiness_poll_interval(mut self, interval: Duration) -> Self {
        self.readiness_poll_interval = interval;
        self
    }

    /// Set the default readiness deadline.
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = timeout;
        self
    }
}

fn to_millis(duration: &Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(super::to_millis(duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&super::to_millis(duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
