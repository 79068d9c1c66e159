//! Engine facade: a test tree, its configuration and lifecycle callbacks.
//!
//! [`Engine::run`] hands the tree to the scheduler, re-running the whole
//! tree when a suite-level failure occurs and `suite_retry` allows it. With
//! `auto_clean` enabled the tree is cleared once all attempts finish, so
//! the same engine can be reused for the next batch of registrations.

mod callbacks;
pub mod config;

pub use callbacks::{
    AbortCallback, Callbacks, Event, ResultCallback, SuiteRetryCallback, TestRetryCallback,
};
pub use config::{DEFAULT_SUITE_TIMEOUT, DEFAULT_TEST_TIMEOUT, EngineConfig};

use crate::result::RunResults;
use crate::scheduler::{AbortHandle, RunState, Scheduler};
use crate::tree::{ConfigurationError, TestTree};
use tracing::{info, warn};

/// Owns a test tree and runs it.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    callbacks: Callbacks,
    tree: TestTree,
    abort: AbortHandle,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine with an empty tree.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let tree = TestTree::new(config.description.clone());
        Self {
            config,
            callbacks: Callbacks::default(),
            tree,
            abort: AbortHandle::default(),
        }
    }

    /// Replace the lifecycle callbacks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration, renaming the root suite to match.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.tree.set_description(config.description.clone());
        self.config = config;
    }

    /// Registered callbacks.
    #[must_use]
    pub const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Registered tree.
    #[must_use]
    pub const fn tree(&self) -> &TestTree {
        &self.tree
    }

    /// Mutable access for registration.
    pub const fn tree_mut(&mut self) -> &mut TestTree {
        &mut self.tree
    }

    /// Register a top-level describe block.
    ///
    /// # Errors
    ///
    /// Propagates the [`ConfigurationError`] raised by the body.
    pub fn describe<F>(&mut self, description: &str, body: F) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut TestTree) -> Result<(), ConfigurationError>,
    {
        self.tree.describe(description, body)
    }

    /// Handle for aborting from another task or from inside an action.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Request that the current run stop at its next checkpoint.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Lifecycle state of the most recent run.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.abort.state()
    }

    /// Drop every registration and reset the abort flag and run state.
    pub fn clean(&mut self) {
        self.tree.clear();
        self.abort.reset();
    }

    /// Run the registered tree.
    pub async fn run(&mut self) -> RunResults {
        self.abort.set_state(RunState::Running);
        let mut attempt: u32 = 1;
        let results = loop {
            let report =
                Scheduler::new(&self.tree, &self.config, &self.callbacks, &self.abort).run().await;
            let exhausted = attempt > self.config.suite_retry;
            if !report.retryable || exhausted || report.results.aborted {
                break report.results;
            }
            attempt += 1;
            warn!(
                target: "tsukemono::engine",
                attempt,
                error = ?report.results.error,
                "suite-level failure; re-running the tree"
            );
            self.callbacks.suite_retry(&report.results, attempt);
        };

        let state = if results.aborted {
            RunState::Aborted
        } else {
            RunState::Completed
        };
        if self.config.auto_clean {
            self.clean();
        }
        self.abort.set_state(state);
        info!(target: "tsukemono::engine", %state, attempts = attempt, "run complete");
        results
    }
}
