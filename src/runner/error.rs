//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::parser::ParseError;
use crate::tree::ConfigurationError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised before a feature run starts.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// Feature text could not be parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
    /// The assembled test tree was rejected.
    #[error("could not assemble the test tree: {0}")]
    #[diagnostic(code(tsukemono::runner::configuration))]
    Configuration(#[from] ConfigurationError),
}
