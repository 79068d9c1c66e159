//! Misuse of the test-tree registration calls.

use thiserror::Error;

/// A registration call made in the wrong place or with bad arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `test` was called while the cursor pointed at the root.
    #[error("test must be called within a describe (`{description}`)")]
    TestOutsideDescribe {
        /// Description of the rejected test.
        description: String,
    },
    /// A describe or test was registered without a description.
    #[error("{kind} requires a non-empty description")]
    EmptyDescription {
        /// `describe` or `test`.
        kind: &'static str,
    },
}
