use super::*;
use crate::ast::{Scenario, Step, StepKeyword};
use crate::hooks::HookKind;
use crate::result::{ResultStatus, RunErrorKind};
use crate::steps::StepDefinition;
use crate::tree::action;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    let mut entries = match log.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    entries.push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

#[fixture]
fn log() -> Log {
    Log::default()
}

fn recording_definitions(log: &Log) -> Definitions {
    let mut definitions = Definitions::new();
    let given = Arc::clone(log);
    let when = Arc::clone(log);
    let then = Arc::clone(log);
    definitions.register_steps([
        StepDefinition::given("a value of {int}", move |args, ctx| {
            let log = Arc::clone(&given);
            async move {
                push(&log, format!("given {}", Value::Array(args.clone())));
                ctx.world.set("args", Value::Array(args));
                Ok(())
            }
        }),
        StepDefinition::when("I add {int}", move |args, ctx| {
            let log = Arc::clone(&when);
            async move {
                let current = ctx
                    .world
                    .get("args")
                    .and_then(|args| args.get(0).and_then(Value::as_i64))
                    .unwrap_or_default();
                let added = args.first().and_then(Value::as_i64).unwrap_or_default();
                push(&log, format!("add {added}"));
                ctx.world.set("total", current + added);
                Ok(())
            }
        }),
        StepDefinition::then("the total is {int}", move |args, ctx| {
            let log = Arc::clone(&then);
            async move {
                push(&log, "then");
                anyhow::ensure!(
                    ctx.world.get("total").as_ref() == args.first(),
                    "unexpected total {:?}",
                    ctx.world.get("total")
                );
                Ok(())
            }
        }),
    ]);
    definitions
}

fn statuses(results: &RunResults) -> Vec<(String, Option<ResultStatus>)> {
    results
        .tests()
        .into_iter()
        .map(|test| (test.description.clone(), test.status))
        .collect()
}

#[rstest]
#[tokio::test]
async fn binds_a_step_and_extracts_its_arguments(log: Log) {
    let definitions = recording_definitions(&log);
    let world = World::new();
    let text = "Feature: Values\n  Scenario: five\n    Given a value of 5\n";

    let results = run(text, &RunOptions::default(), &definitions, world.clone())
        .await
        .expect("run");

    assert_eq!(results.stats.passed_specs, 1);
    assert_eq!(world.get("args"), Some(json!([5])));
    let test = results.tests().into_iter().next().expect("one test");
    assert_eq!(test.description, "Given a value of 5");
    let meta = test.meta_data.as_ref().expect("step metadata");
    assert_eq!(meta.get("definition"), Some(&json!("a value of {int}")));
}

#[rstest]
#[tokio::test]
async fn background_steps_run_before_each_scenario(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Sums
  Background:
    Given a value of 1
  Scenario: add two
    When I add 2
    Then the total is 3
  Scenario: add four
    When I add 4
    Then the total is 5
";

    let results = run(text, &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    assert!(results.passed(), "{results:#?}");
    assert_eq!(
        entries(&log),
        ["given [1]", "add 2", "then", "given [1]", "add 4", "then"]
    );
    let feature = results.results.first().expect("feature");
    assert_eq!(feature.description, "Feature: Sums");
    let scenario = feature.children.first().expect("scenario");
    assert_eq!(scenario.description, "Scenario: add two");
    assert_eq!(scenario.children.len(), 3);
}

#[rstest]
#[tokio::test]
async fn outlines_expand_one_scenario_per_example_row(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Outline
  Scenario Outline: add <n>
    Given a value of 1
    When I add <n>
    Then the total is <total>
    Examples:
      | n | total |
      | 2 | 3     |
      | 5 | 6     |
";

    let results = run(text, &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    assert!(results.passed(), "{results:#?}");
    let feature = results.results.first().expect("feature");
    let names: Vec<_> = feature
        .children
        .iter()
        .map(|child| child.description.as_str())
        .collect();
    assert_eq!(names, ["Scenario: add 2", "Scenario: add 5"]);
    assert!(entries(&log).contains(&"add 5".to_owned()));
}

#[rstest]
#[tokio::test]
async fn unbound_steps_fail_without_stopping_siblings(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Unbound
  Scenario: broken
    Given nothing matches this
    Given a value of 2
";

    let results = run(text, &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(results.stats.failed_specs, 1);
    assert_eq!(results.stats.passed_specs, 1);
    let failed = results
        .tests()
        .into_iter()
        .find(|test| test.is_failed())
        .expect("failed step");
    let error = failed.error.as_ref().expect("match error");
    assert_eq!(error.kind, RunErrorKind::Match);
    assert!(error.message.contains("nothing matches this"));
}

#[rstest]
#[tokio::test]
async fn tags_select_skip_and_disable_scenarios(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Tags
  @smoke
  Scenario: kept
    Given a value of 1
  @smoke @skip
  Scenario: skipped by tag
    Given a value of 2
  @smoke @wip
  Scenario: disabled
    Given a value of 3
  Scenario: filtered
    Given a value of 4
";
    let options = RunOptions {
        tags: TagOptions::default()
            .with_filter(["smoke"])
            .with_disabled(["@wip"]),
        ..RunOptions::default()
    };

    let results = run(text, &options, &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(entries(&log), ["given [1]"]);
    assert_eq!(
        statuses(&results),
        [
            ("Given a value of 1".to_owned(), Some(ResultStatus::Passed)),
            ("Given a value of 2".to_owned(), Some(ResultStatus::Skipped)),
            ("Given a value of 3".to_owned(), Some(ResultStatus::Skipped)),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn only_tagged_scenarios_run_exclusively(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Focus
  Scenario: other
    Given a value of 1
  @only
  Scenario: focused
    Given a value of 2
";

    run(text, &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(entries(&log), ["given [2]"]);
}

#[rstest]
#[tokio::test]
async fn name_filter_omits_other_scenarios(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "\
Feature: Names
  Scenario: First case
    Given a value of 1
  Scenario: Second case
    Given a value of 2
";
    let options = RunOptions {
        name: Some("second".to_owned()),
        ..RunOptions::default()
    };

    let results = run(text, &options, &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(results.tests().len(), 1);
    assert_eq!(entries(&log), ["given [2]"]);
}

#[rstest]
#[tokio::test]
async fn feature_hooks_wrap_features_and_scenarios(log: Log) {
    let mut definitions = recording_definitions(&log);
    for (kind, label) in [
        (HookKind::BeforeAll, "beforeAll"),
        (HookKind::AfterAll, "afterAll"),
        (HookKind::BeforeEach, "beforeEach"),
        (HookKind::AfterEach, "afterEach"),
    ] {
        let log = Arc::clone(&log);
        let hook = action(move || {
            push(&log, label);
            async { Ok(()) }
        });
        let hooks = definitions.hooks_mut();
        match kind {
            HookKind::BeforeAll => hooks.before_all(hook),
            HookKind::AfterAll => hooks.after_all(hook),
            HookKind::BeforeEach => hooks.before_each(hook),
            HookKind::AfterEach => hooks.after_each(hook),
        }
    }
    let text = "\
Feature: Hooks
  Scenario: one
    Given a value of 1
  Scenario: two
    Given a value of 2
";

    run(text, &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(
        entries(&log),
        [
            "beforeAll",
            "beforeEach",
            "given [1]",
            "afterEach",
            "beforeEach",
            "given [2]",
            "afterEach",
            "afterAll",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn step_options_disable_steps_by_id(log: Log) {
    let definitions = recording_definitions(&log);
    let text = "Feature: Ids\n  Scenario: two\n    Given a value of 1\n    Given a value of 2\n";
    let feature = crate::parser::parse_feature(text).expect("parse");
    let second = feature
        .scenarios
        .first()
        .and_then(|scenario| scenario.steps.get(1))
        .map(|step| step.id.clone())
        .expect("second step");
    let mut options = RunOptions::default();
    options.steps.insert(
        second,
        StepOptions {
            disabled: true,
            ..StepOptions::default()
        },
    );

    run(feature, &options, &definitions, World::new())
        .await
        .expect("run");

    assert_eq!(entries(&log), ["given [1]"]);
}

#[rstest]
#[tokio::test]
async fn pre_parsed_features_receive_ids(log: Log) {
    let definitions = recording_definitions(&log);
    let feature = Feature {
        description: "Built".to_owned(),
        scenarios: vec![Scenario {
            description: "by hand".to_owned(),
            steps: vec![Step {
                id: String::new(),
                keyword: StepKeyword::Given,
                text: "a value of 7".to_owned(),
                table: None,
                doc_string: None,
                line: 0,
            }],
            ..Scenario::default()
        }],
        ..Feature::default()
    };

    let results = run(vec![feature], &RunOptions::default(), &definitions, World::new())
        .await
        .expect("run");

    let scenario = results
        .results
        .first()
        .and_then(|feature| feature.children.first())
        .expect("scenario");
    let uuid = scenario
        .meta_data
        .as_ref()
        .and_then(|meta| meta.get("uuid"))
        .and_then(Value::as_str)
        .expect("uuid");
    assert!(!uuid.is_empty());
}

#[rstest]
#[tokio::test]
async fn malformed_text_is_a_parse_error(log: Log) {
    let definitions = recording_definitions(&log);
    let err = run(
        vec!["Feature: ok\n".to_owned(), "Given stray\n".to_owned()],
        &RunOptions::default(),
        &definitions,
        World::new(),
    )
    .await
    .expect_err("parse error");
    assert!(matches!(err, RunnerError::Parse(_)));
}

