//! Options accepted by a feature run.
//!
//! ```rust
//! use tsukemono::runner::RunOptions;
//!
//! let options: RunOptions = serde_json::from_value(serde_json::json!({
//!     "timeout": 250,
//!     "tags": { "filter": "@smoke", "disabled": ["@wip"] },
//!     "steps": { "shared": { "retry": 1 } }
//! }))
//! .expect("options");
//! assert_eq!(options.tags.filter, ["@smoke"]);
//! ```

use crate::engine::config::optional_millis;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Key in [`RunOptions::steps`] whose options apply to every step.
pub const SHARED_STEP_OPTIONS: &str = "shared";

/// Per-step overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepOptions {
    /// Retries granted to the step.
    pub retry: Option<u32>,
    /// Timeout of the step; zero disables it.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Report the step skipped without running it.
    pub disabled: bool,
}

impl StepOptions {
    /// Fill unset fields of `self` from `fallback`.
    #[must_use]
    pub fn or(&self, fallback: &Self) -> Self {
        Self {
            retry: self.retry.or(fallback.retry),
            timeout: self.timeout.or(fallback.timeout),
            disabled: self.disabled || fallback.disabled,
        }
    }
}

/// Tag-based scenario selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TagOptions {
    /// Keep only scenarios carrying every one of these tags.
    #[serde(deserialize_with = "one_or_many")]
    pub filter: Vec<String>,
    /// Report scenarios carrying any of these tags as skipped.
    #[serde(deserialize_with = "one_or_many")]
    pub disabled: Vec<String>,
}

/// Options for [`crate::runner::FeatureRunner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
    /// Keep only scenarios whose description contains this text, ignoring
    /// case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Retries granted to every step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Timeout applied to every step.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Tag-based selection.
    pub tags: TagOptions,
    /// Overrides keyed by step id, plus [`SHARED_STEP_OPTIONS`].
    pub steps: IndexMap<String, StepOptions>,
}

impl RunOptions {
    /// Effective options for the step identified by `id`: its own entry,
    /// then the shared entry, then the run-wide retry and timeout.
    #[must_use]
    pub fn step(&self, id: &str) -> StepOptions {
        let run_wide = StepOptions {
            retry: self.retry,
            timeout: self.timeout,
            disabled: false,
        };
        let shared = self
            .steps
            .get(SHARED_STEP_OPTIONS)
            .map_or_else(|| run_wide.clone(), |shared| shared.or(&run_wide));
        self.steps
            .get(id)
            .map_or_else(|| shared.clone(), |own| own.or(&shared))
    }

    /// Whether `description` passes the name filter.
    #[must_use]
    pub fn matches_name(&self, description: &str) -> bool {
        self.name.as_deref().is_none_or(|name| {
            description
                .to_lowercase()
                .contains(&name.trim().to_lowercase())
        })
    }
}

fn normalise_tag(raw: &str) -> String {
    let tag = raw.trim();
    if tag.starts_with('@') {
        tag.to_owned()
    } else {
        format!("@{tag}")
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let tags = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(tags)) => tags.split_whitespace().map(normalise_tag).collect(),
        Some(OneOrMany::Many(tags)) => tags.iter().map(|tag| normalise_tag(tag)).collect(),
    };
    Ok(tags)
}

impl TagOptions {
    /// Keep only scenarios tagged with every tag in `tags`.
    #[must_use]
    pub fn with_filter<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter = tags.into_iter().map(|tag| normalise_tag(tag.as_ref())).collect();
        self
    }

    /// Skip scenarios tagged with any tag in `tags`.
    #[must_use]
    pub fn with_disabled<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled = tags.into_iter().map(|tag| normalise_tag(tag.as_ref())).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn step_options_layer_over_shared_and_run_wide_values() {
        let options: RunOptions = serde_json::from_value(json!({
            "retry": 3,
            "timeout": 100,
            "steps": {
                "shared": { "timeout": 200 },
                "abc": { "retry": 1, "disabled": true }
            }
        }))
        .expect("options");

        let own = options.step("abc");
        assert_eq!(own.retry, Some(1));
        assert_eq!(own.timeout, Some(Duration::from_millis(200)));
        assert!(own.disabled);

        let other = options.step("xyz");
        assert_eq!(other.retry, Some(3));
        assert_eq!(other.timeout, Some(Duration::from_millis(200)));
        assert!(!other.disabled);
    }

    #[rstest]
    #[case(json!("smoke @fast"), &["@smoke", "@fast"])]
    #[case(json!(["@smoke"]), &["@smoke"])]
    #[case(json!(null), &[])]
    fn tag_lists_accept_strings_or_arrays(#[case] filter: serde_json::Value, #[case] expected: &[&str]) {
        let options: RunOptions =
            serde_json::from_value(json!({ "tags": { "filter": filter } })).expect("options");
        assert_eq!(options.tags.filter, expected);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("ADD"), true)]
    #[case(Some("subtract"), false)]
    fn name_filter_ignores_case(#[case] name: Option<&str>, #[case] matches: bool) {
        let options = RunOptions {
            name: name.map(str::to_owned),
            ..RunOptions::default()
        };
        assert_eq!(options.matches_name("Adds two numbers"), matches);
    }
}
