//! Shared run control: the abort flag and the run state.

use super::AbortSignal;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run has started since the engine was created or cleaned.
    NotStarted,
    /// A run is in progress.
    Running,
    /// The last run stopped at an abort checkpoint.
    Aborted,
    /// The last run walked the whole tree.
    Completed,
}

impl RunState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Aborted => 2,
            Self::Completed => 3,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Aborted,
            3 => Self::Completed,
            _ => Self::NotStarted,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Aborted => "aborted",
            Self::Completed => "completed",
        })
    }
}

#[derive(Debug)]
struct Control {
    abort: AtomicBool,
    state: AtomicU8,
}

/// Cloneable handle used to request a cooperative abort and observe the
/// run state from actions or other tasks.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    inner: Arc<Control>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self {
            inner: Arc::new(Control {
                abort: AtomicBool::new(false),
                state: AtomicU8::new(RunState::NotStarted.to_u8()),
            }),
        }
    }
}

impl AbortHandle {
    /// Request that the run stop at its next checkpoint.
    pub fn abort(&self) {
        self.inner.abort.store(true, Ordering::SeqCst);
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.abort.load(Ordering::SeqCst)
    }

    /// Fail with [`AbortSignal`] when an abort has been requested, letting
    /// long-running actions stop early with `?`.
    ///
    /// # Errors
    ///
    /// Returns [`AbortSignal`] once [`AbortHandle::abort`] has been called.
    pub fn check(&self) -> Result<(), AbortSignal> {
        if self.is_aborted() {
            Err(AbortSignal)
        } else {
            Ok(())
        }
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        RunState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: RunState) {
        self.inner.state.store(state.to_u8(), Ordering::SeqCst);
    }

    pub(crate) fn reset(&self) {
        self.inner.abort.store(false, Ordering::SeqCst);
        self.set_state(RunState::NotStarted);
    }
}
