//! Nodes of the test tree.

use super::Action;
use crate::hooks::Hooks;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Index of a describe node within its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescribeId(usize);

impl DescribeId {
    /// The root node.
    pub const ROOT: Self = Self(0);

    pub(super) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the tree's arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How a node was registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Runs normally.
    #[default]
    Normal,
    /// Runs exclusively, switching the tree into only-mode.
    Only,
    /// Reported skipped without running.
    Skip,
}

/// Per-test overrides and free-form metadata copied into results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMeta {
    /// Timeout for this test; zero disables it.
    #[serde(
        default,
        with = "crate::engine::config::optional_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    /// Retry count for this test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    /// Report a failure as `warning` instead of `failed`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warn_on_failed: bool,
    /// Additional metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestMeta {
    /// Metadata overriding only the timeout.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Metadata overriding only the retry count.
    #[must_use]
    pub fn retry(retry: u32) -> Self {
        Self {
            retry: Some(retry),
            ..Self::default()
        }
    }
}

/// A registered test.
#[derive(Clone)]
pub struct TestLeaf {
    pub(super) description: String,
    pub(super) action: Option<Action>,
    pub(super) meta: TestMeta,
    pub(super) only: bool,
    pub(super) skip: bool,
    pub(super) disabled: bool,
}

impl fmt::Debug for TestLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestLeaf")
            .field("description", &self.description)
            .field("meta", &self.meta)
            .field("only", &self.only)
            .field("skip", &self.skip)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl TestLeaf {
    /// Test description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The test body; `None` for `xtest` registrations.
    #[must_use]
    pub const fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    /// Per-test overrides.
    #[must_use]
    pub const fn meta(&self) -> &TestMeta {
        &self.meta
    }

    /// Registered with `only`.
    #[must_use]
    pub const fn is_only(&self) -> bool {
        self.only
    }

    /// Registered with `skip` or as `xtest`.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Registered as `xtest`.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Mark the test skipped.
    pub const fn disable(&mut self) {
        self.skip = true;
    }
}

/// The root node or a `describe` block.
#[derive(Debug, Clone, Default)]
pub struct Describe {
    pub(super) description: String,
    pub(super) parent: Option<DescribeId>,
    pub(super) tests: Vec<TestLeaf>,
    pub(super) describes: Vec<DescribeId>,
    pub(super) hooks: Hooks,
    pub(super) meta: Map<String, Value>,
    pub(super) only: bool,
    pub(super) skip: bool,
    pub(super) only_child: bool,
}

impl Describe {
    pub(super) fn new(description: String, parent: Option<DescribeId>) -> Self {
        Self {
            description,
            parent,
            ..Self::default()
        }
    }

    /// Describe description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Enclosing describe; `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<DescribeId> {
        self.parent
    }

    /// Tests in registration order.
    #[must_use]
    pub fn tests(&self) -> &[TestLeaf] {
        &self.tests
    }

    /// Nested describes in registration order.
    #[must_use]
    pub fn describes(&self) -> &[DescribeId] {
        &self.describes
    }

    /// Hooks registered on this node.
    #[must_use]
    pub const fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Metadata copied into this node's results.
    #[must_use]
    pub const fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Registered with `only`.
    #[must_use]
    pub const fn is_only(&self) -> bool {
        self.only
    }

    /// Registered with `skip`.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Some descendant was registered with `only`.
    #[must_use]
    pub const fn has_only_child(&self) -> bool {
        self.only_child
    }

    /// Whether any own test was registered with `only`.
    #[must_use]
    pub fn has_only_test(&self) -> bool {
        self.tests.iter().any(TestLeaf::is_only)
    }
}
