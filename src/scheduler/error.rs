//! Failures raised by the scheduler's timeout and retry policies.

use crate::result::{RunError, RunErrorKind};
use std::time::Duration;
use thiserror::Error;

/// An action or the whole run exceeded its allotted time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{name}` exceeded its timeout of {}ms", .timeout.as_millis())]
pub struct TimeoutError {
    /// Description of the timed-out node.
    pub name: String,
    /// The limit that was exceeded.
    pub timeout: Duration,
}

/// Every attempt of a retried test failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{name}` failed after {attempts} attempts, last error: {last}")]
pub struct RetryExhaustedError {
    /// Description of the test.
    pub name: String,
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Failure of the final attempt.
    pub last: RunError,
}

/// A cooperative stop request. Not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run aborted")]
pub struct AbortSignal;

impl From<TimeoutError> for RunError {
    fn from(err: TimeoutError) -> Self {
        Self::new(RunErrorKind::Timeout, err.to_string())
    }
}

impl From<RetryExhaustedError> for RunError {
    fn from(err: RetryExhaustedError) -> Self {
        Self::new(RunErrorKind::RetryExhausted, err.to_string())
    }
}
