//! Errors raised while binding step text to a definition.

use thiserror::Error;

/// Failure to bind a step to a definition or to convert its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// No registered definition matched the step text.
    #[error("no matching step definition for `{text}`")]
    NoMatch {
        /// The step text that failed to match.
        text: String,
    },
    /// An expression referenced a parameter type that is not registered.
    #[error("unknown parameter type `{{{name}}}` in pattern `{pattern}`")]
    UnknownParamType {
        /// Name inside the placeholder.
        name: String,
        /// Pattern containing the placeholder.
        pattern: String,
    },
    /// The pattern could not be compiled into a regular expression.
    #[error("invalid step pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why compilation failed.
        message: String,
    },
    /// A parameter transform rejected the captured text.
    #[error("cannot convert `{raw}` with parameter type `{name}`: {message}")]
    Transform {
        /// Parameter type whose transform failed.
        name: String,
        /// Captured text.
        raw: String,
        /// Transform error message.
        message: String,
    },
}
