//! Lifecycle callbacks fired while a run progresses.
//!
//! Every callback receives a snapshot of the current result. Callbacks are
//! plain synchronous functions; they run on the scheduler's thread of
//! control between checkpoints.

use crate::result::{RunResult, RunResults};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Callback receiving a result snapshot.
pub type ResultCallback = Arc<dyn Fn(&RunResult) + Send + Sync>;

/// Callback receiving a test snapshot and the attempt about to start.
pub type TestRetryCallback = Arc<dyn Fn(&RunResult, u32) + Send + Sync>;

/// Callback receiving the failed run and the attempt about to start.
pub type SuiteRetryCallback = Arc<dyn Fn(&RunResults, u32) + Send + Sync>;

/// Callback fired once when an abort request is observed.
pub type AbortCallback = Arc<dyn Fn() + Send + Sync>;

/// Points in a run that emit a result snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Before the root suite starts.
    RunStart,
    /// After the root suite finishes.
    RunDone,
    /// Before a suite runs its hooks.
    SuiteStart,
    /// After a suite finishes.
    SuiteDone,
    /// Before a test runs.
    SpecStart,
    /// After a test finishes or is skipped.
    SpecDone,
}

/// Optional lifecycle callbacks.
#[derive(Clone, Default)]
pub struct Callbacks {
    on_abort: Option<AbortCallback>,
    on_run_start: Option<ResultCallback>,
    on_run_done: Option<ResultCallback>,
    on_suite_start: Option<ResultCallback>,
    on_suite_done: Option<ResultCallback>,
    on_spec_start: Option<ResultCallback>,
    on_spec_done: Option<ResultCallback>,
    on_test_retry: Option<TestRetryCallback>,
    on_suite_retry: Option<SuiteRetryCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_abort", &self.on_abort.is_some())
            .field("on_run_start", &self.on_run_start.is_some())
            .field("on_run_done", &self.on_run_done.is_some())
            .field("on_suite_start", &self.on_suite_start.is_some())
            .field("on_suite_done", &self.on_suite_done.is_some())
            .field("on_spec_start", &self.on_spec_start.is_some())
            .field("on_spec_done", &self.on_spec_done.is_some())
            .field("on_test_retry", &self.on_test_retry.is_some())
            .field("on_suite_retry", &self.on_suite_retry.is_some())
            .finish()
    }
}

impl Callbacks {
    /// Fire `f` when an abort request is observed.
    #[must_use]
    pub fn on_abort(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_abort = Some(Arc::new(f));
        self
    }

    /// Fire `f` for `event`.
    #[must_use]
    pub fn on(mut self, event: Event, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        let callback: ResultCallback = Arc::new(f);
        *self.slot(event) = Some(callback);
        self
    }

    /// Fire `f` before the root suite starts.
    #[must_use]
    pub fn on_run_start(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::RunStart, f)
    }

    /// Fire `f` after the root suite finishes.
    #[must_use]
    pub fn on_run_done(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::RunDone, f)
    }

    /// Fire `f` before each suite.
    #[must_use]
    pub fn on_suite_start(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::SuiteStart, f)
    }

    /// Fire `f` after each suite.
    #[must_use]
    pub fn on_suite_done(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::SuiteDone, f)
    }

    /// Fire `f` before each test.
    #[must_use]
    pub fn on_spec_start(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::SpecStart, f)
    }

    /// Fire `f` after each test.
    #[must_use]
    pub fn on_spec_done(self, f: impl Fn(&RunResult) + Send + Sync + 'static) -> Self {
        self.on(Event::SpecDone, f)
    }

    /// Fire `f` before each test retry.
    #[must_use]
    pub fn on_test_retry(mut self, f: impl Fn(&RunResult, u32) + Send + Sync + 'static) -> Self {
        self.on_test_retry = Some(Arc::new(f));
        self
    }

    /// Fire `f` before each suite retry.
    #[must_use]
    pub fn on_suite_retry(
        mut self,
        f: impl Fn(&RunResults, u32) + Send + Sync + 'static,
    ) -> Self {
        self.on_suite_retry = Some(Arc::new(f));
        self
    }

    const fn slot(&mut self, event: Event) -> &mut Option<ResultCallback> {
        match event {
            Event::RunStart => &mut self.on_run_start,
            Event::RunDone => &mut self.on_run_done,
            Event::SuiteStart => &mut self.on_suite_start,
            Event::SuiteDone => &mut self.on_suite_done,
            Event::SpecStart => &mut self.on_spec_start,
            Event::SpecDone => &mut self.on_spec_done,
        }
    }

    pub(crate) fn emit(&self, event: Event, result: &RunResult) {
        let callback = match event {
            Event::RunStart => &self.on_run_start,
            Event::RunDone => &self.on_run_done,
            Event::SuiteStart => &self.on_suite_start,
            Event::SuiteDone => &self.on_suite_done,
            Event::SpecStart => &self.on_spec_start,
            Event::SpecDone => &self.on_spec_done,
        };
        trace!(target: "tsukemono::scheduler", ?event, id = %result.id, "lifecycle event");
        if let Some(callback) = callback {
            callback(result);
        }
    }

    pub(crate) fn abort(&self) {
        if let Some(callback) = &self.on_abort {
            callback();
        }
    }

    pub(crate) fn test_retry(&self, result: &RunResult, attempt: u32) {
        if let Some(callback) = &self.on_test_retry {
            callback(result, attempt);
        }
    }

    pub(crate) fn suite_retry(&self, results: &RunResults, attempt: u32) {
        if let Some(callback) = &self.on_suite_retry {
            callback(results, attempt);
        }
    }
}
