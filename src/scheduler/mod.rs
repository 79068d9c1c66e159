//! Depth-first executor over a [`TestTree`].
//!
//! For every describe the scheduler fires the suite-start callback, prunes
//! the subtree when it is skipped or excluded by only-mode, runs
//! `beforeAll` hooks, runs each test (wrapped in `beforeEach`/`afterEach`
//! and the timeout and retry policies), recurses into nested describes,
//! then runs `afterAll` hooks and fires the suite-done callback.
//!
//! Stats, the bail policy and the abort flag are shared by the whole walk.
//! Abort is checked before each test and before each nested describe; an
//! in-flight action always finishes first.
//!
//! The suite timeout is a deadline shared by every action. Once it passes,
//! the action in flight fails with a timeout, the remaining tests and
//! describes are reported skipped, and every open describe still closes
//! with the children it finished.

mod control;
mod error;
mod policy;

pub use control::{AbortHandle, RunState};
pub use error::{AbortSignal, RetryExhaustedError, TimeoutError};

use crate::engine::{Callbacks, EngineConfig, Event};
use crate::hooks::HookKind;
use crate::result::{
    Outcome, ResultKind, ResultSubject, RunError, RunErrorKind, RunResult, RunResults, RunStats,
    build_result, now_millis,
};
use crate::tree::{Describe, TestLeaf, TestTree};
use futures::FutureExt;
use futures::future::BoxFuture;
use policy::Budget;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Position of a describe within the walk.
#[derive(Debug, Clone)]
struct Scope {
    path: String,
    full_name: String,
    only: bool,
}

impl Scope {
    const fn root() -> Self {
        Self {
            path: String::new(),
            full_name: String::new(),
            only: false,
        }
    }

    fn join_path(&self, index: usize) -> String {
        if self.path.is_empty() {
            index.to_string()
        } else {
            format!("{}.{index}", self.path)
        }
    }

    fn join_name(&self, description: &str) -> String {
        if self.full_name.is_empty() {
            description.to_owned()
        } else {
            format!("{} {description}", self.full_name)
        }
    }

    fn child(&self, node: &Describe, index: usize) -> Self {
        Self {
            path: self.join_path(index),
            full_name: self.join_name(node.description()),
            only: self.only || node.is_only(),
        }
    }

    fn suite_id(&self) -> String {
        format!("suite-{}", self.path)
    }

    fn spec_id(&self, index: usize) -> String {
        format!("spec-{}", self.join_path(index))
    }
}

/// Everything the scheduler produced for one pass over the tree.
#[derive(Debug, Clone)]
pub struct SchedulerReport {
    /// Results and flags of the pass.
    pub results: RunResults,
    /// A hook failed or the suite timed out, so a suite retry applies.
    pub retryable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortCheck {
    Continue,
    Observed,
    Stopped,
}

/// One pass of the scheduler over a tree.
pub struct Scheduler<'a> {
    tree: &'a TestTree,
    config: &'a EngineConfig,
    callbacks: &'a Callbacks,
    abort: &'a AbortHandle,
    stats: RunStats,
    completed: Vec<RunResult>,
    error: Option<RunError>,
    aborted: bool,
    bailed: bool,
    failed_any: bool,
    hook_failed: bool,
    deadline: Option<Instant>,
    timed_out: bool,
}

fn test_kind(leaf: &TestLeaf) -> ResultKind {
    if leaf.is_disabled() {
        ResultKind::Xtest
    } else {
        ResultKind::Test
    }
}

impl<'a> Scheduler<'a> {
    /// Prepare a pass over `tree`.
    #[must_use]
    pub fn new(
        tree: &'a TestTree,
        config: &'a EngineConfig,
        callbacks: &'a Callbacks,
        abort: &'a AbortHandle,
    ) -> Self {
        Self {
            tree,
            config,
            callbacks,
            abort,
            stats: RunStats::default(),
            completed: Vec::new(),
            error: None,
            aborted: false,
            bailed: false,
            failed_any: false,
            hook_failed: false,
            deadline: None,
            timed_out: false,
        }
    }

    fn root_subject(&self) -> ResultSubject<'a> {
        let root = self.tree.root();
        ResultSubject {
            id: "root",
            description: root.map_or("root", Describe::description),
            full_name: "",
            kind: ResultKind::Root,
            meta: root.map(Describe::meta),
        }
    }

    /// Walk the whole tree within the suite timeout.
    pub async fn run(mut self) -> SchedulerReport {
        self.stats.run_start = now_millis();
        let subject = self.root_subject();
        self.callbacks.emit(
            Event::RunStart,
            &build_result(&subject, Outcome::Started, self.stats.run_start),
        );
        info!(target: "tsukemono::scheduler", root = subject.description, "run started");

        let suite_timeout = self.config.effective_suite_timeout();
        self.deadline = suite_timeout.map(|limit| Instant::now() + limit);
        self.walk_root().await;

        let timed_out = if self.suite_expired() {
            suite_timeout.map(|timeout| TimeoutError {
                name: subject.description.to_owned(),
                timeout,
            })
        } else {
            None
        };
        let retryable = self.hook_failed || timed_out.is_some();
        if let Some(err) = timed_out {
            warn!(target: "tsukemono::scheduler", error = %err, "suite timed out");
            self.error = Some(err.into());
        }

        self.stats.run_end = now_millis();
        let results = RunResults {
            results: self.completed,
            stats: self.stats,
            aborted: self.aborted,
            bailed: self.bailed,
            error: self.error,
        };
        let done = build_result(
            &subject,
            Outcome::Finished {
                children: results.results.clone(),
                error: results.error.clone(),
            },
            results.stats.run_end,
        );
        self.callbacks.emit(Event::RunDone, &done);
        info!(
            target: "tsukemono::scheduler",
            passed = results.stats.passed_specs,
            failed = results.stats.failed_specs,
            aborted = results.aborted,
            bailed = results.bailed,
            "run finished"
        );
        SchedulerReport { results, retryable }
    }

    async fn walk_root(&mut self) {
        let tree = self.tree;
        let Some(root) = tree.root() else {
            return;
        };
        let scope = Scope::root();
        match self.run_hooks(root, HookKind::BeforeAll).await {
            Ok(()) => {
                self.run_children(root, &scope, true).await;
            }
            Err(err) => {
                self.hook_failed = true;
                self.error = Some(err);
                let skipped = self.skipped_children(root, &scope);
                self.completed.extend(skipped);
            }
        }
        if let Err(err) = self.run_hooks(root, HookKind::AfterAll).await {
            self.hook_failed = true;
            self.error.get_or_insert(err);
        }
    }

    fn check_abort(&mut self) -> AbortCheck {
        if self.aborted {
            return AbortCheck::Stopped;
        }
        if !self.abort.is_aborted() {
            return AbortCheck::Continue;
        }
        self.aborted = true;
        warn!(target: "tsukemono::scheduler", "abort requested; stopping at checkpoint");
        self.callbacks.abort();
        AbortCheck::Observed
    }

    /// Whether the suite deadline has passed. Latches once observed.
    fn suite_expired(&mut self) -> bool {
        if !self.timed_out && self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!(target: "tsukemono::scheduler", "suite deadline passed; skipping the rest");
            self.timed_out = true;
        }
        self.timed_out
    }

    const fn budget(&self, timeout: Option<Duration>) -> Budget {
        Budget::new(timeout, self.deadline)
    }

    /// Replace a timeout caused by the suite deadline with the suite's own
    /// timeout error.
    fn blame_deadline(&mut self, err: RunError) -> RunError {
        if err.kind != RunErrorKind::Timeout || !self.suite_expired() {
            return err;
        }
        let name = self.tree.root().map_or("root", Describe::description);
        self.config
            .effective_suite_timeout()
            .map_or(err, |timeout| {
                TimeoutError {
                    name: name.to_owned(),
                    timeout,
                }
                .into()
            })
    }

    fn halted(&self) -> bool {
        (self.config.bail > 0 && self.stats.failed_specs >= self.config.bail)
            || (self.config.exit_on_failed && self.failed_any)
    }

    fn record(&mut self, children: &mut Vec<RunResult>, result: RunResult, at_root: bool) {
        if at_root {
            self.completed.push(result);
        } else {
            children.push(result);
        }
    }

    async fn run_children(
        &mut self,
        node: &'a Describe,
        scope: &Scope,
        at_root: bool,
    ) -> Vec<RunResult> {
        let mut children = Vec::new();
        for (index, leaf) in node.tests().iter().enumerate() {
            match self.check_abort() {
                AbortCheck::Continue => {}
                AbortCheck::Observed => {
                    let id = scope.spec_id(index);
                    let full_name = scope.join_name(leaf.description());
                    let subject = ResultSubject {
                        id: &id,
                        description: leaf.description(),
                        full_name: &full_name,
                        kind: test_kind(leaf),
                        meta: None,
                    };
                    let result = build_result(&subject, Outcome::Aborted, now_millis());
                    self.record(&mut children, result, at_root);
                    return children;
                }
                AbortCheck::Stopped => return children,
            }
            let result = self.run_test(node, leaf, scope, index).await;
            self.record(&mut children, result, at_root);
        }
        let tree = self.tree;
        for (index, child_id) in node.describes().iter().enumerate() {
            let Some(child) = tree.node(*child_id) else {
                continue;
            };
            match self.check_abort() {
                AbortCheck::Continue => {}
                AbortCheck::Observed => {
                    let child_scope = scope.child(child, index);
                    let id = child_scope.suite_id();
                    let subject = ResultSubject {
                        id: &id,
                        description: child.description(),
                        full_name: &child_scope.full_name,
                        kind: ResultKind::Describe,
                        meta: None,
                    };
                    let result = build_result(&subject, Outcome::Aborted, now_millis());
                    self.record(&mut children, result, at_root);
                    return children;
                }
                AbortCheck::Stopped => return children,
            }
            let result = self.walk_describe(child, scope, index).await;
            self.record(&mut children, result, at_root);
        }
        children
    }

    fn describe_selected(&self, node: &Describe, parent: &Scope) -> bool {
        !self.tree.only_mode().is_active()
            || node.is_only()
            || node.has_only_child()
            || parent.only
    }

    fn test_selected(&self, node: &Describe, leaf: &TestLeaf, scope: &Scope) -> bool {
        if leaf.is_skipped() || leaf.action().is_none() {
            return false;
        }
        !self.tree.only_mode().is_active()
            || leaf.is_only()
            || (scope.only && !node.has_only_test())
    }

    fn walk_describe<'s>(
        &'s mut self,
        node: &'a Describe,
        parent: &'s Scope,
        index: usize,
    ) -> BoxFuture<'s, RunResult> {
        async move {
            let scope = parent.child(node, index);
            let id = scope.suite_id();
            let subject = ResultSubject {
                id: &id,
                description: node.description(),
                full_name: &scope.full_name,
                kind: ResultKind::Describe,
                meta: Some(node.meta()),
            };
            self.callbacks.emit(
                Event::SuiteStart,
                &build_result(&subject, Outcome::Started, now_millis()),
            );

            let expired = self.suite_expired();
            let halted = self.halted();
            if expired || halted || node.is_skipped() || !self.describe_selected(node, parent) {
                if halted && !self.bailed {
                    info!(target: "tsukemono::scheduler", suite = %id, "bail threshold reached");
                }
                self.bailed |= halted;
                let mut result = build_result(&subject, Outcome::Skipped, now_millis());
                result.children = self.skipped_children(node, &scope);
                self.callbacks.emit(Event::SuiteDone, &result);
                return result;
            }

            debug!(target: "tsukemono::scheduler", suite = %id, description = node.description(), "suite started");
            let (children, mut error) = match self.run_hooks(node, HookKind::BeforeAll).await {
                Ok(()) => (self.run_children(node, &scope, false).await, None),
                Err(err) => {
                    self.hook_failed = true;
                    (self.skipped_children(node, &scope), Some(err))
                }
            };
            if let Err(err) = self.run_hooks(node, HookKind::AfterAll).await {
                self.hook_failed = true;
                error.get_or_insert(err);
            }
            let result = build_result(
                &subject,
                Outcome::Finished { children, error },
                now_millis(),
            );
            if result.is_failed() {
                self.stats.failed_suites += 1;
            } else {
                self.stats.passed_suites += 1;
            }
            debug!(target: "tsukemono::scheduler", suite = %id, status = ?result.status, "suite done");
            self.callbacks.emit(Event::SuiteDone, &result);
            result
        }
        .boxed()
    }

    fn skipped_children(&self, node: &Describe, scope: &Scope) -> Vec<RunResult> {
        let timestamp = now_millis();
        let tests = node.tests().iter().enumerate().map(|(index, leaf)| {
            let id = scope.spec_id(index);
            let full_name = scope.join_name(leaf.description());
            let subject = ResultSubject {
                id: &id,
                description: leaf.description(),
                full_name: &full_name,
                kind: test_kind(leaf),
                meta: Some(&leaf.meta().extra),
            };
            build_result(&subject, Outcome::Skipped, timestamp)
        });
        let describes = node
            .describes()
            .iter()
            .filter_map(|child_id| self.tree.node(*child_id))
            .enumerate()
            .map(|(index, child)| {
                let child_scope = scope.child(child, index);
                let id = child_scope.suite_id();
                let subject = ResultSubject {
                    id: &id,
                    description: child.description(),
                    full_name: &child_scope.full_name,
                    kind: ResultKind::Describe,
                    meta: Some(child.meta()),
                };
                let mut result = build_result(&subject, Outcome::Skipped, timestamp);
                result.children = self.skipped_children(child, &child_scope);
                result
            });
        tests.chain(describes).collect()
    }

    async fn run_hooks(&mut self, node: &Describe, kind: HookKind) -> Result<(), RunError> {
        let budget = self.budget(self.config.effective_test_timeout());
        for hook in node.hooks().get(kind) {
            if self.suite_expired() {
                debug!(target: "tsukemono::scheduler", hook = %kind, suite = node.description(), "hook skipped after suite deadline");
                return Ok(());
            }
            let name = format!("{kind} hook of `{}`", node.description());
            if let Err(err) = policy::settle(&name, hook, budget).await {
                let cause = self.blame_deadline(err);
                warn!(target: "tsukemono::scheduler", hook = %kind, suite = node.description(), error = %cause, "hook failed");
                return Err(RunError::new(
                    RunErrorKind::Hook,
                    format!("{name} failed: {}", cause.message),
                ));
            }
        }
        Ok(())
    }

    fn skip_reason(&mut self, node: &Describe, leaf: &TestLeaf, scope: &Scope) -> Option<&'static str> {
        if !self.test_selected(node, leaf, scope) {
            return Some("not selected");
        }
        if self.suite_expired() {
            return Some("suite timed out");
        }
        if self.halted() {
            if !self.bailed {
                info!(target: "tsukemono::scheduler", failed = self.stats.failed_specs, "bail threshold reached");
            }
            self.bailed = true;
            return Some("bailed");
        }
        if self.config.skip_after_failed && self.failed_any {
            return Some("earlier failure");
        }
        None
    }

    async fn run_test(
        &mut self,
        node: &'a Describe,
        leaf: &'a TestLeaf,
        scope: &Scope,
        index: usize,
    ) -> RunResult {
        let id = scope.spec_id(index);
        let full_name = scope.join_name(leaf.description());
        let subject = ResultSubject {
            id: &id,
            description: leaf.description(),
            full_name: &full_name,
            kind: test_kind(leaf),
            meta: Some(&leaf.meta().extra),
        };

        if let Some(reason) = self.skip_reason(node, leaf, scope) {
            debug!(target: "tsukemono::scheduler", spec = %id, reason, "test skipped");
            let result = build_result(&subject, Outcome::Skipped, now_millis());
            self.callbacks.emit(Event::SpecDone, &result);
            return result;
        }
        let Some(action) = leaf.action() else {
            return build_result(&subject, Outcome::Skipped, now_millis());
        };

        let start = build_result(&subject, Outcome::Started, now_millis());
        self.callbacks.emit(Event::SpecStart, &start);
        debug!(target: "tsukemono::scheduler", spec = %id, description = leaf.description(), "test started");

        let mut settled = self.run_hooks(node, HookKind::BeforeEach).await;
        if settled.is_ok() {
            let budget = self.budget(self.config.resolve_test_timeout(leaf.meta().timeout));
            let retry = leaf.meta().retry.unwrap_or(self.config.test_retry);
            let callbacks = self.callbacks;
            settled = policy::settle_with_retry(&full_name, action, budget, retry, |attempt| {
                callbacks.test_retry(&start, attempt);
            })
            .await
            .map_err(|err| self.blame_deadline(err));
        }
        let after = self.run_hooks(node, HookKind::AfterEach).await;
        if settled.is_ok() {
            settled = after;
        }

        let outcome = match settled {
            Ok(()) => {
                self.stats.passed_specs += 1;
                Outcome::Passed
            }
            Err(err) if leaf.meta().warn_on_failed => {
                warn!(target: "tsukemono::scheduler", spec = %id, error = %err, "test failed with warning");
                Outcome::Warning(err)
            }
            Err(err) => {
                self.stats.failed_specs += 1;
                self.failed_any = true;
                info!(target: "tsukemono::scheduler", spec = %id, error = %err, "test failed");
                Outcome::Failed(err)
            }
        };
        let result = build_result(&subject, outcome, now_millis());
        self.callbacks.emit(Event::SpecDone, &result);
        result
    }
}
