//! Feature runner.
//!
//! This module is the bridge from feature text to results: it parses the
//! source when needed, assembles a test tree from the features against a
//! set of [`Definitions`], and hands the tree to an [`Engine`].
//!
//! ```rust
//! use tsukemono::definitions::Definitions;
//! use tsukemono::runner::{FeatureRunner, RunOptions};
//! use tsukemono::steps::StepDefinition;
//!
//! # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
//! let mut definitions = Definitions::new();
//! definitions.register_steps([StepDefinition::given("a value of {int}", |args, ctx| async move {
//!     ctx.world.set("value", args[0].clone());
//!     Ok(())
//! })]);
//! let text = "Feature: Values\n  Scenario: five\n    Given a value of 5\n";
//! let mut runner = FeatureRunner::new(&definitions);
//! let results = runner.run(text, &RunOptions::default()).await.expect("run");
//! assert_eq!(results.stats.passed_specs, 1);
//! # });
//! ```

mod assemble;
mod error;
mod options;

pub use error::RunnerError;
pub use options::{RunOptions, SHARED_STEP_OPTIONS, StepOptions, TagOptions};

use crate::ast::Feature;
use crate::definitions::Definitions;
use crate::engine::config::optional_millis;
use crate::engine::{Callbacks, Engine, EngineConfig};
use crate::parser::{ParseError, assign_ids, parse_features};
use crate::result::RunResults;
use crate::world::World;
use assemble::Assembly;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// What a feature run consumes.
#[derive(Debug, Clone)]
pub enum FeatureSource {
    /// Feature text, possibly holding several features.
    Text(String),
    /// Several feature texts.
    Texts(Vec<String>),
    /// A parsed feature.
    Feature(Feature),
    /// Parsed features.
    Features(Vec<Feature>),
}

impl FeatureSource {
    /// Parse text sources and fill in missing ids on parsed ones.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when any text fails to parse.
    pub fn into_features(self) -> Result<Vec<Feature>, ParseError> {
        match self {
            Self::Text(text) => parse_features(&text),
            Self::Texts(texts) => texts.iter().try_fold(Vec::new(), |mut features, text| {
                features.extend(parse_features(text)?);
                Ok(features)
            }),
            Self::Feature(feature) => Ok(with_ids(vec![feature])),
            Self::Features(features) => Ok(with_ids(features)),
        }
    }
}

fn with_ids(mut features: Vec<Feature>) -> Vec<Feature> {
    features.iter_mut().for_each(assign_ids);
    features
}

impl From<&str> for FeatureSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for FeatureSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for FeatureSource {
    fn from(texts: Vec<String>) -> Self {
        Self::Texts(texts)
    }
}

impl From<Feature> for FeatureSource {
    fn from(feature: Feature) -> Self {
        Self::Feature(feature)
    }
}

impl From<Vec<Feature>> for FeatureSource {
    fn from(features: Vec<Feature>) -> Self {
        Self::Features(features)
    }
}

/// Runs features against a set of definitions.
#[derive(Debug)]
pub struct FeatureRunner<'d> {
    definitions: &'d Definitions,
    world: World,
    engine: Engine,
}

impl<'d> FeatureRunner<'d> {
    /// Runner with an empty World and a default engine.
    #[must_use]
    pub fn new(definitions: &'d Definitions) -> Self {
        Self {
            definitions,
            world: World::new(),
            engine: Engine::default(),
        }
    }

    /// Share `world` with every step.
    #[must_use]
    pub fn with_world(mut self, world: World) -> Self {
        self.world = world;
        self
    }

    /// Replace the engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.engine.set_config(config);
        self
    }

    /// Replace the lifecycle callbacks.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.engine = self.engine.with_callbacks(callbacks);
        self
    }

    /// The World handed to steps.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The engine executing the assembled tree.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable engine access, for example to abort from another task.
    pub const fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Assemble `source` into the engine's tree and run it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Parse`] for malformed text and
    /// [`RunnerError::Configuration`] when the tree cannot be assembled.
    /// Failures while running are reported in the returned results.
    pub async fn run(
        &mut self,
        source: impl Into<FeatureSource>,
        options: &RunOptions,
    ) -> Result<RunResults, RunnerError> {
        let features = source.into().into_features()?;
        let assembly = Assembly {
            definitions: self.definitions,
            world: &self.world,
            options,
        };
        let tree = self.engine.tree_mut();
        for feature in &features {
            assembly.feature(tree, feature)?;
        }
        info!(
            target: "tsukemono::runner",
            features = features.len(),
            nodes = self.engine.tree().len(),
            "test tree assembled"
        );
        Ok(self.engine.run().await)
    }
}

/// Run `source` with `definitions` in `world` using a default engine.
///
/// # Errors
///
/// As for [`FeatureRunner::run`].
pub async fn run(
    source: impl Into<FeatureSource>,
    options: &RunOptions,
    definitions: &Definitions,
    world: World,
) -> Result<RunResults, RunnerError> {
    FeatureRunner::new(definitions)
        .with_world(world)
        .run(source, options)
        .await
}

/// Options accepted by [`run_tests`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunTestsOptions {
    /// Timeout applied to every step.
    #[serde(with = "optional_millis", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Run parsed `features` in `world` against `definitions`.
///
/// # Errors
///
/// Returns [`RunnerError::Configuration`] when the tree cannot be
/// assembled.
pub async fn run_tests(
    features: Vec<Feature>,
    world: World,
    definitions: &Definitions,
    options: RunTestsOptions,
) -> Result<RunResults, RunnerError> {
    let run_options = RunOptions {
        timeout: options.timeout,
        ..RunOptions::default()
    };
    run(features, &run_options, definitions, world).await
}

#[cfg(test)]
mod tests;
