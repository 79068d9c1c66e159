//! Behaviour of the engine over hand-built test trees.

use rstest::rstest;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use test_support::results::{normalised, test_statuses};
use test_support::{Recorder, flaky, never_settles};
use tsukemono::Callbacks;
use tsukemono::engine::{Engine, EngineConfig};
use tsukemono::result::RunErrorKind;
use tsukemono::scheduler::RunState;
use tsukemono::tree::{ConfigurationError, TestMeta, TestTree};

fn register(engine: &mut Engine, recorder: &Recorder) {
    engine
        .describe("suite", |tree| {
            tree.test("one", recorder.action("one"))?;
            tree.describe("nested", |tree| tree.test("two", recorder.action("two")))
        })
        .expect("registration");
}

#[rstest]
#[tokio::test]
async fn consecutive_runs_of_an_auto_cleaned_engine_match() {
    let recorder = Recorder::new();
    let mut engine = Engine::default();

    register(&mut engine, &recorder);
    let first = normalised(engine.run().await);
    register(&mut engine, &recorder);
    let second = normalised(engine.run().await);

    assert_eq!(first, second);
    assert_eq!(recorder.entries(), ["one", "two", "one", "two"]);
}

#[rstest]
#[case(1)]
#[case(3)]
#[tokio::test]
async fn flaky_tests_pass_with_enough_retries(#[case] failures: u32) {
    let (action, calls) = flaky(failures);
    let retries = Recorder::new();
    let seen = retries.clone();
    let config = EngineConfig {
        test_retry: failures,
        ..EngineConfig::default()
    };
    let callbacks = Callbacks::default()
        .on_test_retry(move |_, attempt| seen.record(attempt.to_string()));
    let mut engine = Engine::new(config).with_callbacks(callbacks);
    engine
        .describe("suite", |tree| tree.test("flaky", action))
        .expect("registration");

    let results = engine.run().await;

    assert!(results.passed());
    assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
    assert_eq!(retries.entries().len(), usize::try_from(failures).expect("fits"));
}

#[rstest]
#[tokio::test]
async fn per_test_retry_overrides_the_engine_default() {
    let (action, calls) = flaky(2);
    let mut engine = Engine::default();
    engine
        .describe("suite", |tree| {
            tree.test_with("flaky", action, TestMeta::retry(2), tsukemono::tree::Mode::Normal)
        })
        .expect("registration");

    let results = engine.run().await;

    assert!(results.passed());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test]
async fn bail_skips_everything_after_the_first_failure() {
    let recorder = Recorder::new();
    let config = EngineConfig {
        bail: 1,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);
    engine
        .describe("suite", |tree| {
            tree.test("first", recorder.failing("first"))?;
            tree.test("second", recorder.action("second"))?;
            tree.test("third", recorder.action("third"))
        })
        .expect("registration");

    let results = engine.run().await;

    assert!(results.bailed);
    assert_eq!(recorder.entries(), ["first"]);
    assert_eq!(
        test_statuses(&results),
        [
            ("first".to_owned(), "failed".to_owned()),
            ("second".to_owned(), "skipped".to_owned()),
            ("third".to_owned(), "skipped".to_owned()),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn never_settling_tests_time_out_promptly() {
    let config = EngineConfig {
        test_timeout: Some(Duration::from_millis(50)),
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(config);
    engine
        .describe("suite", |tree| tree.test("hangs", never_settles()))
        .expect("registration");

    let started = Instant::now();
    let results = engine.run().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    let test = results.tests().into_iter().next().expect("test result");
    assert_eq!(test.error.as_ref().map(|e| e.kind), Some(RunErrorKind::Timeout));
}

#[rstest]
#[tokio::test]
async fn abort_from_another_task_stops_the_run() {
    let recorder = Recorder::new();
    let mut engine = Engine::default();
    let handle = engine.abort_handle();
    engine
        .describe("suite", |tree| {
            tree.test(
                "waits",
                tsukemono::tree::action(|| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                }),
            )?;
            tree.test("after", recorder.action("after"))
        })
        .expect("registration");

    let aborter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
    });
    let results = engine.run().await;
    aborter.await.expect("aborter");

    assert!(results.aborted);
    assert!(recorder.entries().is_empty());
    assert_eq!(engine.state(), RunState::Aborted);
}

#[rstest]
fn tests_directly_under_the_root_are_rejected() {
    let recorder = Recorder::new();
    let mut tree = TestTree::default();
    let err = tree
        .test("orphan", recorder.action("orphan"))
        .expect_err("root test");
    assert_eq!(
        err,
        ConfigurationError::TestOutsideDescribe {
            description: "orphan".to_owned()
        }
    );
    assert!(err.to_string().contains("test must be called within a describe"));
}
