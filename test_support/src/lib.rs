//! Test utilities shared by the integration tests.
//!
//! [`Recorder`] collects labels from actions and callbacks so tests can
//! assert on execution order. The action helpers build the awkward cases:
//! flaky actions, actions that never settle, and failing ones.

pub mod features;
pub mod results;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tsukemono::tree::{Action, action};

/// Thread-safe, cloneable log of labels.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry`.
    pub fn record(&self, entry: impl Into<String>) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(entry.into());
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// An action recording `label` and succeeding.
    #[must_use]
    pub fn action(&self, label: &str) -> Action {
        let recorder = self.clone();
        let label = label.to_owned();
        action(move || {
            recorder.record(label.clone());
            async { Ok(()) }
        })
    }

    /// An action recording `label` and failing.
    #[must_use]
    pub fn failing(&self, label: &str) -> Action {
        let recorder = self.clone();
        let label = label.to_owned();
        action(move || {
            recorder.record(label.clone());
            let message = format!("{label} failed");
            async move { Err(anyhow::anyhow!(message)) }
        })
    }
}

/// An action failing its first `failures` calls, with its call counter.
#[must_use]
pub fn flaky(failures: u32) -> (Action, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let flaky = action(move || {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            anyhow::ensure!(call > failures, "attempt {call} of a flaky action failed");
            Ok(())
        }
    });
    (flaky, calls)
}

/// An action whose future never completes.
#[must_use]
pub fn never_settles() -> Action {
    action(futures::future::pending::<anyhow::Result<()>>)
}
