//! Turn parsed features into a test tree.
//!
//! Each feature becomes a describe, each rule a nested describe, and each
//! scenario (or outline example row) a describe whose tests are its steps,
//! background steps first. Steps are bound to definitions while the tree is
//! assembled; a step without a definition becomes a test that fails with
//! the [`MatchError`](crate::matcher::MatchError).

use super::RunOptions;
use crate::ast::{Background, Examples, Feature, Rule, Scenario, Step, Tags};
use crate::definitions::{BoundStep, Definitions};
use crate::hooks::HookKind;
use crate::steps::StepContext;
use crate::tree::{Action, ConfigurationError, Mode, TestMeta, TestTree, action};
use crate::world::World;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

const SKIP_TAG: &str = "@skip";
const ONLY_TAG: &str = "@only";

/// A scenario that survived selection, with outline placeholders filled in.
#[derive(Debug, Clone)]
struct Planned {
    scenario: Scenario,
    mode: Mode,
}

pub(super) struct Assembly<'r> {
    pub(super) definitions: &'r Definitions,
    pub(super) world: &'r World,
    pub(super) options: &'r RunOptions,
}

fn tag_meta(tags: &Tags) -> Value {
    Value::Array(tags.iter().cloned().map(Value::String).collect())
}

fn node_meta(kind: &str, id: &str, tags: &Tags) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("type".to_owned(), json!(kind));
    meta.insert("uuid".to_owned(), json!(id));
    if !tags.is_empty() {
        meta.insert("tags".to_owned(), tag_meta(tags));
    }
    meta
}

fn substitute(text: &str, header: &[String], row: &[String]) -> String {
    header
        .iter()
        .zip(row)
        .fold(text.to_owned(), |filled, (column, value)| {
            filled.replace(&format!("<{column}>"), value)
        })
}

fn substitute_step(step: &Step, header: &[String], row: &[String]) -> Step {
    Step {
        text: substitute(&step.text, header, row),
        table: step.table.as_ref().map(|table| {
            table
                .iter()
                .map(|cells| cells.iter().map(|cell| substitute(cell, header, row)).collect())
                .collect()
        }),
        doc_string: step
            .doc_string
            .as_ref()
            .map(|doc| substitute(doc, header, row)),
        ..step.clone()
    }
}

fn expand_examples(scenario: &Scenario, examples: &Examples, block: usize) -> Vec<Scenario> {
    let header = examples.header();
    examples
        .rows()
        .enumerate()
        .map(|(index, row)| {
            let mut description = substitute(&scenario.description, header, row);
            if description == scenario.description {
                description = format!("{description} (example {})", index + 1);
            }
            let mut tags = scenario.tags.clone();
            tags.extend(examples.tags.iter().cloned());
            Scenario {
                id: format!("{}-{block}-{index}", scenario.id),
                description,
                tags,
                steps: scenario
                    .steps
                    .iter()
                    .map(|step| substitute_step(step, header, row))
                    .collect(),
                examples: Vec::new(),
                narrative: scenario.narrative.clone(),
                line: examples.line,
            }
        })
        .collect()
}

/// One scenario per example row for outlines, the scenario itself otherwise.
pub(super) fn expand(scenario: &Scenario) -> Vec<Scenario> {
    if scenario.examples.is_empty() {
        return vec![scenario.clone()];
    }
    scenario
        .examples
        .iter()
        .enumerate()
        .flat_map(|(block, examples)| expand_examples(scenario, examples, block))
        .collect()
}

impl Assembly<'_> {
    fn mode_for(&self, tags: &Tags) -> Mode {
        let disabled = self
            .options
            .tags
            .disabled
            .iter()
            .any(|tag| tags.contains(tag));
        if disabled || tags.contains(SKIP_TAG) {
            Mode::Skip
        } else if tags.contains(ONLY_TAG) {
            Mode::Only
        } else {
            Mode::Normal
        }
    }

    fn plan(&self, scenarios: &[Scenario], inherited: &Tags) -> Vec<Planned> {
        scenarios
            .iter()
            .flat_map(expand)
            .filter_map(|scenario| {
                let mut tags = inherited.clone();
                tags.extend(scenario.tags.iter().cloned());
                let tagged = self.options.tags.filter.iter().all(|tag| tags.contains(tag));
                if !tagged || !self.options.matches_name(&scenario.description) {
                    debug!(target: "tsukemono::runner", scenario = %scenario.description, "scenario filtered out");
                    return None;
                }
                let mode = self.mode_for(&tags);
                Some(Planned { scenario, mode })
            })
            .collect()
    }

    /// Register `feature` beneath the tree's current cursor. Features with
    /// no selected scenario are left out.
    pub(super) fn feature(&self, tree: &mut TestTree, feature: &Feature) -> Result<(), ConfigurationError> {
        let scenarios = self.plan(&feature.scenarios, &feature.tags);
        let rules: Vec<(&Rule, Vec<Planned>)> = feature
            .rules
            .iter()
            .map(|rule| {
                let mut inherited = feature.tags.clone();
                inherited.extend(rule.tags.iter().cloned());
                (rule, self.plan(&rule.scenarios, &inherited))
            })
            .filter(|(_, planned)| !planned.is_empty())
            .collect();
        if scenarios.is_empty() && rules.is_empty() {
            debug!(target: "tsukemono::runner", feature = %feature.description, "no scenarios selected");
            return Ok(());
        }

        let description = format!("Feature: {}", feature.description);
        let meta = node_meta("feature", &feature.id, &feature.tags);
        let hooks = self.definitions.hooks();
        tree.describe_with(&description, Mode::Normal, meta, |node| {
            for hook in hooks.registered(HookKind::BeforeAll) {
                node.before_all(hook.clone());
            }
            for hook in hooks.registered(HookKind::AfterAll) {
                node.after_all(hook.clone());
            }
            let backgrounds: Vec<&Background> = feature.background.iter().collect();
            for planned in &scenarios {
                self.scenario(node, planned, &backgrounds)?;
            }
            for (rule, planned) in &rules {
                self.rule(node, rule, planned, &backgrounds)?;
            }
            Ok(())
        })
    }

    fn rule(
        &self,
        tree: &mut TestTree,
        rule: &Rule,
        planned: &[Planned],
        inherited: &[&Background],
    ) -> Result<(), ConfigurationError> {
        let description = format!("Rule: {}", rule.description);
        let meta = node_meta("rule", &rule.id, &rule.tags);
        let mut backgrounds = inherited.to_vec();
        backgrounds.extend(rule.background.iter());
        tree.describe_with(&description, Mode::Normal, meta, |node| {
            planned
                .iter()
                .try_for_each(|scenario| self.scenario(node, scenario, &backgrounds))
        })
    }

    fn scenario(
        &self,
        tree: &mut TestTree,
        planned: &Planned,
        backgrounds: &[&Background],
    ) -> Result<(), ConfigurationError> {
        let scenario = &planned.scenario;
        let description = format!("Scenario: {}", scenario.description);
        let meta = node_meta("scenario", &scenario.id, &scenario.tags);
        let hooks = self.definitions.hooks();
        tree.describe_with(&description, planned.mode, meta, |node| {
            for hook in hooks.registered(HookKind::BeforeEach) {
                node.before_all(hook.clone());
            }
            for hook in hooks.registered(HookKind::AfterEach) {
                node.after_all(hook.clone());
            }
            backgrounds
                .iter()
                .flat_map(|background| background.steps.iter())
                .chain(&scenario.steps)
                .try_for_each(|step| self.step(node, step))
        })
    }

    fn step(&self, tree: &mut TestTree, step: &Step) -> Result<(), ConfigurationError> {
        let options = self.options.step(&step.id);
        let mut extra = Map::new();
        extra.insert("type".to_owned(), json!("step"));
        extra.insert("uuid".to_owned(), json!(step.id));
        extra.insert("step".to_owned(), json!(step.text));
        let action = self.bind(step, &mut extra);
        let meta = TestMeta {
            timeout: options.timeout,
            retry: options.retry,
            warn_on_failed: false,
            extra,
        };
        let mode = if options.disabled {
            Mode::Skip
        } else {
            Mode::Normal
        };
        tree.test_with(&step.source_line(), action, meta, mode)
    }

    fn bind(&self, step: &Step, extra: &mut Map<String, Value>) -> Action {
        match self.definitions.find(&step.text) {
            Ok(BoundStep { definition, args }) => {
                extra.insert(
                    "definition".to_owned(),
                    json!(definition.pattern().source()),
                );
                let world = self.world.clone();
                let source = step.clone();
                action(move || {
                    definition.invoke(args.clone(), StepContext::new(world.clone(), &source))
                })
            }
            Err(err) => {
                warn!(target: "tsukemono::runner", step = %step.source_line(), error = %err, "step is unbound");
                action(move || {
                    let failure = err.clone();
                    async move { Err(anyhow::Error::new(failure)) }
                })
            }
        }
    }
}
