//! Error types for the feature parser.
//!
//! Parse failures carry the offending source so `miette` can render the
//! line with a label pointing at it.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// What went wrong while scanning feature text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A step keyword appeared outside a scenario or background.
    #[error("step `{text}` appears outside any scenario or background")]
    StepOutsideScenario {
        /// The offending step line.
        text: String,
    },
    /// A table row did not have the same column count as the first row.
    #[error("table row has {found} columns but the table started with {expected}")]
    InconsistentTable {
        /// Column count of the first row.
        expected: usize,
        /// Column count of the offending row.
        found: usize,
    },
    /// A table row appeared with no step or examples block to own it.
    #[error("table row has no preceding step or examples block")]
    TableOutsideStep,
    /// A doc-string fence appeared with no step to own it.
    #[error("doc string has no preceding step")]
    DocStringOutsideStep,
    /// The input ended inside a doc string.
    #[error("doc string opened with `{fence}` is never closed")]
    UnterminatedDocString {
        /// Fence that opened the doc string.
        fence: String,
    },
    /// A section keyword appeared before any `Feature:` line.
    #[error("`{keyword}` appears before any `Feature:` line")]
    OutsideFeature {
        /// Keyword found outside a feature.
        keyword: String,
    },
    /// `Examples:` appeared outside a scenario outline.
    #[error("`Examples:` must follow a scenario outline")]
    ExamplesOutsideScenario,
    /// A second background was declared for the same feature or rule.
    #[error("only one `Background:` is allowed per feature or rule")]
    DuplicateBackground,
    /// Free text appeared where only steps, tables or doc strings are valid.
    #[error("unexpected text `{text}`")]
    UnexpectedText {
        /// The offending line.
        text: String,
    },
    /// The text did not contain a single feature.
    #[error("no `Feature:` found")]
    MissingFeature,
}

impl ParseErrorKind {
    fn help(&self) -> Option<&'static str> {
        match self {
            Self::StepOutsideScenario { .. } => {
                Some("add a `Scenario:` or `Background:` header before the step")
            }
            Self::InconsistentTable { .. } => Some("every row must have the same number of cells"),
            Self::UnterminatedDocString { .. } => Some("close the doc string with a matching fence"),
            Self::UnexpectedText { .. } => {
                Some("narrative text is only allowed directly after a section header")
            }
            _ => None,
        }
    }
}

/// Malformed feature text.
#[derive(Debug, Error, Diagnostic)]
#[error("{kind} (line {line})")]
#[diagnostic(code(tsukemono::parser::syntax))]
pub struct ParseError {
    /// Classification of the failure.
    pub kind: ParseErrorKind,
    /// One-based line number of the failure.
    pub line: usize,
    #[source_code]
    source_code: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
}

impl ParseError {
    pub(crate) fn new(
        kind: ParseErrorKind,
        name: &str,
        source: &str,
        line: usize,
        span: (usize, usize),
    ) -> Self {
        let help = kind.help().map(str::to_owned);
        Self {
            kind,
            line,
            source_code: NamedSource::new(name, source.to_owned()),
            span: SourceSpan::from(span),
            help,
        }
    }
}
