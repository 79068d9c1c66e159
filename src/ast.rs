//! Feature Abstract Syntax Tree structures.
//!
//! This module defines the data structures used to represent parsed
//! Gherkin-style feature text. The tree is a faithful rendering of the
//! source: background steps stay on the [`Background`] node and are only
//! prepended to scenarios when the runner assembles a test tree.
//!
//! Nodes are immutable once produced by the parser. They serialise with
//! `serde` so callers can hand a pre-parsed feature (for example one
//! loaded from JSON) straight to the runner.
//!
//! ```rust
//! use tsukemono::parser::parse_feature;
//!
//! let text = "Feature: Sums\n  Scenario: add\n    Given a value of 5\n";
//! let feature = parse_feature(text).expect("parse");
//! assert_eq!(feature.scenarios[0].steps[0].source_line(), "Given a value of 5");
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered set of tag names, stored with their leading `@`.
pub type Tags = IndexSet<String>;

/// Rows of cells attached to a step or an examples block.
pub type Table = Vec<Vec<String>>;

/// Keyword that introduces a step line.
///
/// Keywords are cosmetic for matching purposes: every keyword shares one
/// pool of step definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    /// `Given` precondition.
    Given,
    /// `When` action.
    When,
    /// `Then` outcome.
    Then,
    /// `And` continuation.
    And,
    /// `But` negative continuation.
    But,
}

impl StepKeyword {
    /// All keywords in the order the parser tries them.
    pub const ALL: [Self; 5] = [Self::Given, Self::When, Self::Then, Self::And, Self::But];

    /// Source spelling of the keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step line with its optional data table or doc string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier, used as the key for per-step run options.
    #[serde(default)]
    pub id: String,
    /// Keyword that introduced the step.
    pub keyword: StepKeyword,
    /// Step text following the keyword, exactly as written.
    pub text: String,
    /// Data table rows, when the step carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    /// Doc string content, when the step carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    /// One-based source line of the step.
    #[serde(default)]
    pub line: usize,
}

impl Step {
    /// Reconstruct the step line as written in the source.
    #[must_use]
    pub fn source_line(&self) -> String {
        format!("{} {}", self.keyword, self.text)
    }
}

/// An `Examples:` block belonging to a scenario outline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Examples {
    /// Optional title after `Examples:`.
    #[serde(default)]
    pub description: String,
    /// Tags declared above the block.
    #[serde(default)]
    pub tags: Tags,
    /// Header row followed by one row per example.
    #[serde(default)]
    pub table: Table,
    /// One-based source line of the `Examples:` keyword.
    #[serde(default)]
    pub line: usize,
}

impl Examples {
    /// Column names taken from the header row.
    #[must_use]
    pub fn header(&self) -> &[String] {
        self.table.first().map_or(&[], Vec::as_slice)
    }

    /// Example rows, excluding the header.
    pub fn rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.table.iter().skip(1)
    }
}

/// A scenario or scenario outline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Title after the scenario keyword.
    pub description: String,
    /// Effective tags: local tags when declared, otherwise those inherited
    /// from the enclosing rule or feature.
    #[serde(default)]
    pub tags: Tags,
    /// Steps in source order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Examples blocks for outlines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Examples>,
    /// Free text lines following the header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative: Vec<String>,
    /// One-based source line of the header.
    #[serde(default)]
    pub line: usize,
}

/// Steps shared by every scenario of a feature or rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Background {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Optional title after `Background:`.
    #[serde(default)]
    pub description: String,
    /// Steps in source order.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// One-based source line of the header.
    #[serde(default)]
    pub line: usize,
}

/// A `Rule:` grouping scenarios under a business rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Title after `Rule:`.
    pub description: String,
    /// Effective tags for the rule.
    #[serde(default)]
    pub tags: Tags,
    /// Rule-level background, run after the feature background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    /// Scenarios declared within the rule.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    /// Free text lines following the header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative: Vec<String>,
    /// One-based source line of the header.
    #[serde(default)]
    pub line: usize,
}

/// Root node of a parsed feature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feature {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Title after `Feature:`.
    pub description: String,
    /// Tags declared above the feature.
    #[serde(default)]
    pub tags: Tags,
    /// Feature-level background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    /// Rules in source order.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Scenarios declared directly under the feature.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    /// Free text lines following the header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrative: Vec<String>,
    /// One-based source line of the header.
    #[serde(default)]
    pub line: usize,
}

impl Feature {
    /// Iterate every scenario, including those nested in rules.
    pub fn all_scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios
            .iter()
            .chain(self.rules.iter().flat_map(|rule| rule.scenarios.iter()))
    }
}
