//! Timeout and retry policies for actions.
//!
//! An action is spawned as its own task and raced against a timer. Losing
//! the race yields a timeout error, but the task is only detached: it may
//! keep running after the scheduler has moved on.

use super::{RetryExhaustedError, TimeoutError};
use crate::matcher::MatchError;
use crate::result::{RunError, RunErrorKind};
use crate::tree::Action;
use std::any::Any;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Time one attempt may take: its own timeout, capped by the time left
/// before the suite deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Budget {
    pub(crate) timeout: Option<Duration>,
    pub(crate) deadline: Option<Instant>,
}

impl Budget {
    pub(crate) const fn new(timeout: Option<Duration>, deadline: Option<Instant>) -> Self {
        Self { timeout, deadline }
    }

    fn limit(self) -> Option<Duration> {
        let remaining = self
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        match (self.timeout, remaining) {
            (Some(timeout), Some(left)) => Some(timeout.min(left)),
            (timeout, left) => timeout.or(left),
        }
    }

    /// Whether the suite deadline has passed.
    pub(crate) fn expired(self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Classify an action failure.
pub(crate) fn classify(err: &anyhow::Error) -> RunError {
    let kind = if err.downcast_ref::<MatchError>().is_some() {
        RunErrorKind::Match
    } else if err.downcast_ref::<TimeoutError>().is_some() {
        RunErrorKind::Timeout
    } else {
        RunErrorKind::Failure
    };
    RunError::new(kind, format!("{err:#}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "action panicked".to_owned())
}

fn join_failure(err: JoinError) -> RunError {
    if err.is_panic() {
        let payload = err.into_panic();
        return RunError::new(RunErrorKind::Panic, panic_message(payload.as_ref()));
    }
    RunError::new(RunErrorKind::Failure, err.to_string())
}

/// Run one attempt of `action`, failing once `budget` runs out.
pub(crate) async fn settle(name: &str, action: &Action, budget: Budget) -> Result<(), RunError> {
    let handle = tokio::spawn(action());
    let joined = match budget.limit() {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_elapsed) => {
                warn!(
                    target: "tsukemono::scheduler",
                    name,
                    timeout_ms = limit.as_millis(),
                    "action timed out; leaving it running detached"
                );
                return Err(TimeoutError {
                    name: name.to_owned(),
                    timeout: limit,
                }
                .into());
            }
        },
        None => handle.await,
    };
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(classify(&err)),
        Err(err) => Err(join_failure(err)),
    }
}

/// Run `action` up to `retry + 1` times until an attempt succeeds.
///
/// `on_retry` receives the number of the attempt about to start, from 2.
/// No attempt starts after the suite deadline.
pub(crate) async fn settle_with_retry(
    name: &str,
    action: &Action,
    budget: Budget,
    retry: u32,
    mut on_retry: impl FnMut(u32),
) -> Result<(), RunError> {
    let mut attempt: u32 = 1;
    loop {
        let Err(err) = settle(name, action, budget).await else {
            return Ok(());
        };
        let unretryable = err.kind == RunErrorKind::Match || budget.expired();
        if unretryable || attempt > retry {
            if retry == 0 || unretryable {
                return Err(err);
            }
            return Err(RetryExhaustedError {
                name: name.to_owned(),
                attempts: attempt,
                last: err,
            }
            .into());
        }
        attempt += 1;
        debug!(
            target: "tsukemono::scheduler",
            name,
            attempt,
            error = %err,
            "retrying test"
        );
        on_retry(attempt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::action;
    use rstest::rstest;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(failures: u32) -> (Action, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let flaky = action(move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                anyhow::ensure!(call > failures, "attempt {call} failed");
                Ok(())
            }
        });
        (flaky, calls)
    }

    #[rstest]
    #[tokio::test]
    async fn never_settling_actions_time_out() {
        let pending = action(|| futures::future::pending::<anyhow::Result<()>>());
        let started = std::time::Instant::now();
        let err = settle("hang", &pending, Budget::new(Some(Duration::from_millis(50)), None))
            .await
            .expect_err("timeout");
        assert_eq!(err.kind, RunErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[rstest]
    #[tokio::test]
    async fn panics_are_reported() {
        let boom = action(|| async {
            let explode = true;
            if explode {
                panic!("boom");
            }
            Ok(())
        });
        let err = settle("boom", &boom, Budget::default()).await.expect_err("panic");
        assert_eq!(err.kind, RunErrorKind::Panic);
        assert!(err.message.contains("boom"));
    }

    #[rstest]
    #[tokio::test]
    async fn retries_until_an_attempt_passes() {
        let (flaky, calls) = flaky(2);
        let mut retries = Vec::new();
        settle_with_retry("flaky", &flaky, Budget::default(), 2, |attempt| retries.push(attempt))
            .await
            .expect("third attempt passes");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retries, [2, 3]);
    }

    #[rstest]
    #[tokio::test]
    async fn exhausted_retries_are_reported() {
        let (flaky, calls) = flaky(10);
        let err = settle_with_retry("flaky", &flaky, Budget::default(), 1, |_| {})
            .await
            .expect_err("always fails");
        assert_eq!(err.kind, RunErrorKind::RetryExhausted);
        assert!(err.message.contains("2 attempts"), "{}", err.message);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn without_retry_the_original_error_is_kept() {
        let (flaky, _) = flaky(1);
        let err = settle_with_retry("once", &flaky, Budget::default(), 0, |_| {})
            .await
            .expect_err("fails");
        assert_eq!(err.kind, RunErrorKind::Failure);
        assert!(err.message.contains("attempt 1 failed"));
    }

    #[rstest]
    #[tokio::test]
    async fn the_suite_deadline_caps_an_attempt() {
        let pending = action(|| futures::future::pending::<anyhow::Result<()>>());
        let deadline = Instant::now() + Duration::from_millis(30);
        let started = std::time::Instant::now();
        let err = settle("hang", &pending, Budget::new(None, Some(deadline)))
            .await
            .expect_err("deadline");
        assert_eq!(err.kind, RunErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[rstest]
    #[tokio::test]
    async fn no_retry_starts_after_the_suite_deadline() {
        let (flaky, calls) = flaky(10);
        let expired = Budget::new(None, Some(Instant::now()));
        let mut retries = Vec::new();
        let err = settle_with_retry("late", &flaky, expired, 3, |attempt| retries.push(attempt))
            .await
            .expect_err("fails");
        assert_ne!(err.kind, RunErrorKind::RetryExhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(retries.is_empty());
    }
}
