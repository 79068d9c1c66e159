//! Uniform result records for runs, suites and tests.
//!
//! [`build_result`] is a pure function from a node description and an
//! outcome to a [`RunResult`]. The scheduler uses it for every record it
//! emits; embedding callers may use it to feed custom reporters with the
//! same shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use time::OffsetDateTime;

/// What a result record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultAction {
    /// A suite or test is starting.
    Start,
    /// A suite finished.
    End,
    /// A test finished.
    Test,
    /// A node was skipped without running.
    Skipped,
    /// The run was aborted before this node.
    Abort,
}

/// Final status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// Ran and succeeded.
    Passed,
    /// Ran and failed.
    Failed,
    /// Did not run.
    Skipped,
    /// Failed, but was registered to only warn.
    Warning,
}

/// Kind of node a result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// The whole run.
    Root,
    /// A describe block.
    Describe,
    /// A test.
    Test,
    /// A disabled test.
    Xtest,
}

/// Classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    /// The action returned an error.
    Failure,
    /// The action exceeded its timeout.
    Timeout,
    /// Every retry attempt failed.
    RetryExhausted,
    /// The step text matched no usable definition.
    Match,
    /// A hook failed.
    Hook,
    /// The action panicked.
    Panic,
}

impl RunErrorKind {
    /// Name used in serialised results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Timeout => "timeout",
            Self::RetryExhausted => "retry_exhausted",
            Self::Match => "match",
            Self::Hook => "hook",
            Self::Panic => "panic",
        }
    }
}

/// A recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Classification of the failure.
    pub kind: RunErrorKind,
    /// Human-readable message, including the error chain.
    pub message: String,
}

impl RunError {
    /// Build an error record.
    pub fn new(kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Result record shared by the run, suites and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Path-derived identifier, stable across identical runs.
    pub id: String,
    /// Node description.
    pub description: String,
    /// Descriptions of the enclosing suites and this node, space separated.
    pub full_name: String,
    /// Node kind.
    #[serde(rename = "type")]
    pub kind: ResultKind,
    /// What this record reports.
    pub action: ResultAction,
    /// Final status, absent on start and abort records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResultStatus>,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
    /// Metadata registered with the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<Map<String, Value>>,
    /// Results of the node's tests followed by its nested suites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RunResult>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl RunResult {
    /// Whether the status is [`ResultStatus::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == Some(ResultStatus::Failed)
    }

    /// Every test result beneath and including this record, depth first.
    #[must_use]
    pub fn tests(&self) -> Vec<&Self> {
        let mut found = Vec::new();
        collect_tests(self, &mut found);
        found
    }
}

fn collect_tests<'a>(result: &'a RunResult, found: &mut Vec<&'a RunResult>) {
    if matches!(result.kind, ResultKind::Test | ResultKind::Xtest) {
        found.push(result);
    }
    for child in &result.children {
        collect_tests(child, found);
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    /// Start time in milliseconds since the Unix epoch.
    pub run_start: i64,
    /// End time in milliseconds since the Unix epoch.
    pub run_end: i64,
    /// Tests that passed.
    pub passed_specs: u32,
    /// Tests that failed.
    pub failed_specs: u32,
    /// Suites that passed.
    pub passed_suites: u32,
    /// Suites that failed.
    pub failed_suites: u32,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    /// Results of the root's tests and suites.
    pub results: Vec<RunResult>,
    /// Aggregate counters.
    pub stats: RunStats,
    /// The run stopped early because of an abort request.
    pub aborted: bool,
    /// The run stopped early because of the bail policy.
    pub bailed: bool,
    /// Suite-level failure, such as a suite timeout or a failing root hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl RunResults {
    /// Whether nothing failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.stats.failed_specs == 0 && self.stats.failed_suites == 0
    }

    /// Every test result, depth first.
    #[must_use]
    pub fn tests(&self) -> Vec<&RunResult> {
        self.results.iter().flat_map(RunResult::tests).collect()
    }
}

/// The node a result describes.
#[derive(Debug, Clone, Copy)]
pub struct ResultSubject<'a> {
    /// Path-derived identifier.
    pub id: &'a str,
    /// Node description.
    pub description: &'a str,
    /// Descriptions of the enclosing suites and this node.
    pub full_name: &'a str,
    /// Node kind.
    pub kind: ResultKind,
    /// Metadata registered with the node.
    pub meta: Option<&'a Map<String, Value>>,
}

/// What happened to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The node is starting.
    Started,
    /// A test passed.
    Passed,
    /// A test failed.
    Failed(RunError),
    /// A test failed but only warns.
    Warning(RunError),
    /// The node did not run.
    Skipped,
    /// The run was aborted before the node.
    Aborted,
    /// A suite finished.
    Finished {
        /// Child results.
        children: Vec<RunResult>,
        /// Failure of the suite's own hooks.
        error: Option<RunError>,
    },
}

fn suite_status(children: &[RunResult], error: Option<&RunError>) -> ResultStatus {
    if error.is_some() || children.iter().any(RunResult::is_failed) {
        return ResultStatus::Failed;
    }
    if !children.is_empty()
        && children
            .iter()
            .all(|child| child.status == Some(ResultStatus::Skipped))
    {
        return ResultStatus::Skipped;
    }
    if children
        .iter()
        .any(|child| child.status == Some(ResultStatus::Warning))
    {
        return ResultStatus::Warning;
    }
    ResultStatus::Passed
}

/// Map a node and its outcome to a result record.
#[must_use]
pub fn build_result(subject: &ResultSubject<'_>, outcome: Outcome, timestamp: i64) -> RunResult {
    let (action, status, error, children) = match outcome {
        Outcome::Started => (ResultAction::Start, None, None, Vec::new()),
        Outcome::Passed => (
            ResultAction::Test,
            Some(ResultStatus::Passed),
            None,
            Vec::new(),
        ),
        Outcome::Failed(error) => (
            ResultAction::Test,
            Some(ResultStatus::Failed),
            Some(error),
            Vec::new(),
        ),
        Outcome::Warning(error) => (
            ResultAction::Test,
            Some(ResultStatus::Warning),
            Some(error),
            Vec::new(),
        ),
        Outcome::Skipped => (
            ResultAction::Skipped,
            Some(ResultStatus::Skipped),
            None,
            Vec::new(),
        ),
        Outcome::Aborted => (ResultAction::Abort, None, None, Vec::new()),
        Outcome::Finished { children, error } => {
            let status = suite_status(&children, error.as_ref());
            (ResultAction::End, Some(status), error, children)
        }
    };
    RunResult {
        id: subject.id.to_owned(),
        description: subject.description.to_owned(),
        full_name: subject.full_name.to_owned(),
        kind: subject.kind,
        action,
        status,
        error,
        meta_data: subject.meta.filter(|meta| !meta.is_empty()).cloned(),
        children,
        timestamp,
    }
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    let elapsed = OffsetDateTime::now_utc() - OffsetDateTime::UNIX_EPOCH;
    i64::try_from(elapsed.whole_milliseconds()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn subject() -> ResultSubject<'static> {
        ResultSubject {
            id: "spec-0.0",
            description: "adds",
            full_name: "maths adds",
            kind: ResultKind::Test,
            meta: None,
        }
    }

    fn child(status: Outcome) -> RunResult {
        build_result(&subject(), status, 0)
    }

    #[rstest]
    #[case(Outcome::Started, ResultAction::Start, None)]
    #[case(Outcome::Passed, ResultAction::Test, Some(ResultStatus::Passed))]
    #[case(Outcome::Skipped, ResultAction::Skipped, Some(ResultStatus::Skipped))]
    #[case(Outcome::Aborted, ResultAction::Abort, None)]
    fn maps_outcomes_to_action_and_status(
        subject: ResultSubject<'static>,
        #[case] outcome: Outcome,
        #[case] action: ResultAction,
        #[case] status: Option<ResultStatus>,
    ) {
        let result = build_result(&subject, outcome, 42);
        assert_eq!(result.action, action);
        assert_eq!(result.status, status);
        assert_eq!(result.timestamp, 42);
        assert_eq!(result.id, "spec-0.0");
    }

    #[rstest]
    fn failures_carry_their_error(subject: ResultSubject<'static>) {
        let error = RunError::new(RunErrorKind::Timeout, "too slow");
        let result = build_result(&subject, Outcome::Failed(error.clone()), 0);
        assert!(result.is_failed());
        assert_eq!(result.error, Some(error));
    }

    #[rstest]
    #[case(vec![child(Outcome::Passed), child(Outcome::Skipped)], None, ResultStatus::Passed)]
    #[case(vec![child(Outcome::Passed), child(Outcome::Failed(RunError::new(RunErrorKind::Failure, "x")))], None, ResultStatus::Failed)]
    #[case(vec![child(Outcome::Skipped)], None, ResultStatus::Skipped)]
    #[case(vec![], Some(RunError::new(RunErrorKind::Hook, "beforeAll")), ResultStatus::Failed)]
    #[case(vec![child(Outcome::Warning(RunError::new(RunErrorKind::Failure, "w")))], None, ResultStatus::Warning)]
    #[case(vec![], None, ResultStatus::Passed)]
    fn suite_status_summarises_children(
        #[case] children: Vec<RunResult>,
        #[case] error: Option<RunError>,
        #[case] expected: ResultStatus,
    ) {
        let suite = ResultSubject {
            id: "suite-0",
            description: "maths",
            full_name: "maths",
            kind: ResultKind::Describe,
            meta: None,
        };
        let result = build_result(&suite, Outcome::Finished { children, error }, 0);
        assert_eq!(result.action, ResultAction::End);
        assert_eq!(result.status, Some(expected));
    }

    #[rstest]
    fn serialises_in_camel_case_with_type_field(subject: ResultSubject<'static>) {
        let mut meta = Map::new();
        meta.insert("step".to_owned(), json!("Given a value of 5"));
        let with_meta = ResultSubject {
            meta: Some(&meta),
            ..subject
        };
        let value = serde_json::to_value(build_result(&with_meta, Outcome::Passed, 7))
            .expect("serialise");
        assert_eq!(value["type"], json!("test"));
        assert_eq!(value["fullName"], json!("maths adds"));
        assert_eq!(value["metaData"]["step"], json!("Given a value of 5"));
        assert!(value.get("children").is_none());
    }
}
