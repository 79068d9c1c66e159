//! Tests for the feature parser.

use super::*;
use rstest::rstest;

const SUMS: &str = concat!(
    "@math\n",
    "Feature: Sums\n",
    "  As a user I want to add numbers\n",
    "\n",
    "  Background:\n",
    "    Given a calculator\n",
    "\n",
    "  # a comment between sections\n",
    "  Scenario: add two values\n",
    "    Given a value of 5\n",
    "    And a value of 7\n",
    "    When I add them\n",
    "    Then the total is 12\n",
    "\n",
    "  @slow @nightly\n",
    "  Scenario: tagged locally\n",
    "    Given a value of 1\n",
    "    But nothing else\n",
);

#[rstest]
fn parses_feature_header_tags_and_narrative() {
    let feature = parse_feature(SUMS).expect("parse");
    assert_eq!(feature.description, "Sums");
    assert_eq!(feature.tags.iter().collect::<Vec<_>>(), ["@math"]);
    assert_eq!(feature.narrative, ["As a user I want to add numbers"]);
    assert_eq!(feature.line, 2);
}

#[rstest]
fn background_steps_are_not_spliced_into_scenarios() {
    let feature = parse_feature(SUMS).expect("parse");
    let background = feature.background.as_ref().expect("background");
    assert_eq!(background.steps.len(), 1);
    assert_eq!(background.steps[0].text, "a calculator");
    assert_eq!(feature.scenarios[0].steps.len(), 4);
    assert!(
        feature.scenarios[0]
            .steps
            .iter()
            .all(|step| step.text != "a calculator")
    );
}

#[rstest]
fn scenario_tags_inherit_unless_declared_locally() {
    let feature = parse_feature(SUMS).expect("parse");
    let inherited: Vec<_> = feature.scenarios[0].tags.iter().cloned().collect();
    let local: Vec<_> = feature.scenarios[1].tags.iter().cloned().collect();
    assert_eq!(inherited, ["@math"]);
    assert_eq!(local, ["@slow", "@nightly"]);
}

#[rstest]
fn step_lines_round_trip_in_order() {
    let feature = parse_feature(SUMS).expect("parse");
    let original: Vec<&str> = SUMS
        .lines()
        .skip(8)
        .take(5)
        .map(str::trim)
        .filter(|line| !line.starts_with("Scenario"))
        .collect();
    let rebuilt: Vec<String> = feature.scenarios[0]
        .steps
        .iter()
        .map(Step::source_line)
        .collect();
    assert_eq!(rebuilt, original);
}

#[rstest]
#[case("Given a value of 5", StepKeyword::Given, "a value of 5")]
#[case("When I add them", StepKeyword::When, "I add them")]
#[case("Then the total is 12", StepKeyword::Then, "the total is 12")]
#[case("And another", StepKeyword::And, "another")]
#[case("But not this", StepKeyword::But, "not this")]
fn recognises_each_step_keyword(
    #[case] line: &str,
    #[case] keyword: StepKeyword,
    #[case] text: &str,
) {
    let source = format!("Feature: f\n  Scenario: s\n    {line}\n");
    let feature = parse_feature(&source).expect("parse");
    let step = &feature.scenarios[0].steps[0];
    assert_eq!(step.keyword, keyword);
    assert_eq!(step.text, text);
    assert_eq!(step.line, 3);
}

#[rstest]
fn tables_attach_to_the_previous_step() {
    let source = concat!(
        "Feature: tables\n",
        "  Scenario: users\n",
        "    Given these users:\n",
        "      | name  | role    |\n",
        "      | alice | admin   |\n",
        "      | bob   | a \\| b |\n",
        "    Then done\n",
    );
    let feature = parse_feature(source).expect("parse");
    let steps = &feature.scenarios[0].steps;
    let table = steps[0].table.as_ref().expect("table");
    assert_eq!(
        table,
        &vec![
            vec!["name".to_owned(), "role".to_owned()],
            vec!["alice".to_owned(), "admin".to_owned()],
            vec!["bob".to_owned(), "a | b".to_owned()],
        ]
    );
    assert!(steps[1].table.is_none());
}

#[rstest]
#[case("\"\"\"")]
#[case("```")]
fn doc_strings_keep_relative_indentation(#[case] fence: &str) {
    let source = format!(
        "Feature: docs\n  Scenario: doc\n    Given a payload\n      {fence}\n      {{\n        \"a\": 1\n      }}\n      {fence}\n    Then ok\n"
    );
    let feature = parse_feature(&source).expect("parse");
    let doc = feature.scenarios[0].steps[0]
        .doc_string
        .as_deref()
        .expect("doc string");
    assert_eq!(doc, "{\n  \"a\": 1\n}");
}

#[rstest]
fn rules_own_their_background_and_scenarios() {
    let source = concat!(
        "@feature-tag\n",
        "Feature: rules\n",
        "  @rule-tag\n",
        "  Rule: first rule\n",
        "    Background:\n",
        "      Given rule setup\n",
        "    Scenario: inside\n",
        "      Given something\n",
        "  Rule: second rule\n",
        "    Scenario: inherits feature tags\n",
        "      Given other\n",
    );
    let feature = parse_feature(source).expect("parse");
    assert!(feature.scenarios.is_empty());
    assert_eq!(feature.rules.len(), 2);
    let first = &feature.rules[0];
    assert_eq!(first.description, "first rule");
    assert!(first.background.is_some());
    assert!(first.scenarios[0].tags.contains("@rule-tag"));
    assert!(feature.rules[1].scenarios[0].tags.contains("@feature-tag"));
}

#[rstest]
fn outlines_collect_examples_tables() {
    let source = concat!(
        "Feature: outlines\n",
        "  Scenario Outline: eating\n",
        "    Given there are <start> cucumbers\n",
        "    When I eat <eat> cucumbers\n",
        "    @small\n",
        "    Examples: a few\n",
        "      | start | eat |\n",
        "      | 12    | 5   |\n",
        "      | 20    | 5   |\n",
    );
    let feature = parse_feature(source).expect("parse");
    let examples = &feature.scenarios[0].examples[0];
    assert_eq!(examples.description, "a few");
    assert!(examples.tags.contains("@small"));
    assert_eq!(examples.header(), ["start", "eat"]);
    assert_eq!(examples.rows().count(), 2);
}

#[rstest]
fn parses_multiple_features_from_one_text() {
    let source = "Feature: a\n  Scenario: x\n    Given y\nFeature: b\n  Scenario: z\n    Given w\n";
    let features = parse_features(source).expect("parse");
    let names: Vec<_> = features.iter().map(|f| f.description.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[rstest]
fn ids_are_stable_across_parses() {
    let first = parse_feature(SUMS).expect("parse");
    let second = parse_feature(SUMS).expect("parse");
    assert_eq!(first, second);
    assert!(!first.scenarios[0].steps[0].id.is_empty());
    assert_ne!(
        first.scenarios[0].steps[0].id,
        first.scenarios[0].steps[1].id
    );
}

#[rstest]
#[case(
    "Feature: f\n  Given orphan step\n",
    ParseErrorKind::StepOutsideScenario { text: "Given orphan step".to_owned() },
    2
)]
#[case(
    "Feature: f\n  Scenario: s\n    Given t\n      | a | b |\n      | c |\n",
    ParseErrorKind::InconsistentTable { expected: 2, found: 1 },
    5
)]
#[case(
    "Feature: f\n  Scenario: s\n    | a |\n",
    ParseErrorKind::TableOutsideStep,
    3
)]
#[case(
    "Feature: f\n  Scenario: s\n    Given t\n      \"\"\"\n      never closed\n",
    ParseErrorKind::UnterminatedDocString { fence: "\"\"\"".to_owned() },
    4
)]
#[case(
    "Scenario: before feature\n",
    ParseErrorKind::OutsideFeature { keyword: "Scenario:".to_owned() },
    1
)]
#[case(
    "Feature: f\n  Background:\n    Given a\n  Background:\n",
    ParseErrorKind::DuplicateBackground,
    4
)]
#[case(
    "Feature: f\n  Scenario: s\n    Given a\n    stray text\n",
    ParseErrorKind::UnexpectedText { text: "stray text".to_owned() },
    4
)]
fn reports_malformed_text(
    #[case] source: &str,
    #[case] kind: ParseErrorKind,
    #[case] line: usize,
) {
    let err = parse_features(source).expect_err("should fail");
    assert_eq!(err.kind, kind);
    assert_eq!(err.line, line);
}

#[rstest]
fn empty_text_has_no_feature() {
    let err = parse_feature("# only a comment\n").expect_err("should fail");
    assert_eq!(err.kind, ParseErrorKind::MissingFeature);
    assert!(parse_features("").expect("parse").is_empty());
}

#[rstest]
fn error_message_names_the_line() {
    let err = parse_features("Feature: f\n  Then nope\n").expect_err("should fail");
    assert!(err.to_string().contains("line 2"), "{err}");
}

#[rstest]
#[case("| a | b |", &["a", "b"])]
#[case("|a|b", &["a", "b"])]
#[case("| x \\\\ y | z\\nw |", &["x \\ y", "z\nw"])]
#[case("|  |", &[""])]
fn split_cells_handles_escapes(#[case] row: &str, #[case] expected: &[&str]) {
    assert_eq!(split_cells(row), expected);
}
