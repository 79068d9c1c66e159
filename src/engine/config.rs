//! Engine configuration.
//!
//! Durations serialise as whole milliseconds. A zero duration disables the
//! corresponding timeout. The `timeout` shorthand applies to both the test
//! and the suite timeout unless the specific field is set.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to each test when nothing else is configured.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Timeout applied to a whole run when nothing else is configured.
pub const DEFAULT_SUITE_TIMEOUT: Duration = Duration::from_millis(3_600_000);

/// Root description used when none is configured.
pub const DEFAULT_DESCRIPTION: &str = "root";

/// Serde adapter storing `Option<Duration>` as optional milliseconds.
pub mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialise as an integer number of milliseconds.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => {
                let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    /// Deserialise from an integer number of milliseconds.
    ///
    /// # Errors
    ///
    /// Fails when the value is not an unsigned integer or null.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

/// Tunables for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Description of the root suite.
    pub description: String,
    /// Skip the rest of the run once this many tests have failed; zero
    /// disables bailing.
    pub bail: u32,
    /// Retries granted to each test.
    pub test_retry: u32,
    /// Times the whole tree is re-run after a suite-level failure.
    pub suite_retry: u32,
    /// Shorthand for both timeouts.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Per-test timeout.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub test_timeout: Option<Duration>,
    /// Whole-run timeout.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub suite_timeout: Option<Duration>,
    /// Clear the tree after each run.
    pub auto_clean: bool,
    /// Stop the run after the first failure.
    pub exit_on_failed: bool,
    /// Skip remaining tests once any test has failed.
    pub skip_after_failed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_owned(),
            bail: 0,
            test_retry: 0,
            suite_retry: 0,
            timeout: None,
            test_timeout: None,
            suite_timeout: None,
            auto_clean: true,
            exit_on_failed: false,
            skip_after_failed: false,
        }
    }
}

const fn enabled(duration: Duration) -> Option<Duration> {
    if duration.is_zero() {
        None
    } else {
        Some(duration)
    }
}

impl EngineConfig {
    /// Timeout applied to each test, or `None` when disabled.
    #[must_use]
    pub fn effective_test_timeout(&self) -> Option<Duration> {
        enabled(
            self.test_timeout
                .or(self.timeout)
                .unwrap_or(DEFAULT_TEST_TIMEOUT),
        )
    }

    /// Timeout applied to the whole run, or `None` when disabled.
    #[must_use]
    pub fn effective_suite_timeout(&self) -> Option<Duration> {
        enabled(
            self.suite_timeout
                .or(self.timeout)
                .unwrap_or(DEFAULT_SUITE_TIMEOUT),
        )
    }

    /// Resolve a per-test timeout override against the configured default.
    #[must_use]
    pub fn resolve_test_timeout(&self, override_timeout: Option<Duration>) -> Option<Duration> {
        match override_timeout {
            Some(duration) => enabled(duration),
            None => self.effective_test_timeout(),
        }
    }
}
