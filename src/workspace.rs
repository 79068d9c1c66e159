//! Front-end contract for loading a project from disk.
//!
//! A [`Workspace`] is rooted at a directory. It loads the initial World
//! from `world.json`, collects feature files either from explicit paths and
//! glob patterns or by walking the features directory, and runs them
//! against the [`Definitions`] installed by the embedding program. Step
//! definitions are Rust code, so they are handed over rather than loaded.

use crate::ast::Feature;
use crate::definitions::Definitions;
use crate::parser::parse_named;
use crate::result::RunResults;
use crate::runner::{RunTestsOptions, run_tests};
use crate::world::World;
use anyhow::{Context, Result, anyhow, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Directory searched for `*.feature` files when none are named.
pub const DEFAULT_FEATURES_DIR: &str = "features";

/// File holding the initial World.
pub const DEFAULT_WORLD_FILE: &str = "world.json";

const FEATURE_EXTENSION: &str = "feature";

/// Where a workspace finds its inputs, relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkspaceOptions {
    /// Directory walked for feature files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features_dir: Option<Utf8PathBuf>,
    /// File holding the initial World.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<Utf8PathBuf>,
}

/// A project directory with its definitions.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
    definitions: Definitions,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            definitions: Definitions::new(),
        }
    }
}

impl Workspace {
    /// Workspace rooted at the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root directory that relative paths resolve against.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Re-root the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error when `path` is not a directory.
    pub fn set_root(&mut self, dir: impl AsRef<Utf8Path>) -> Result<()> {
        let path = dir.as_ref();
        ensure!(path.is_dir(), "workspace root {path} is not a directory");
        debug!(target: "tsukemono::workspace", root = %path, "workspace root set");
        self.root = path.to_owned();
        Ok(())
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }

    /// Load the initial World. A missing world file yields an empty World.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or does not hold a
    /// JSON object.
    pub fn world(&self, options: &WorkspaceOptions) -> Result<World> {
        let path = self.resolve(
            options
                .world
                .as_deref()
                .unwrap_or_else(|| Utf8Path::new(DEFAULT_WORLD_FILE)),
        );
        if !path.is_file() {
            debug!(target: "tsukemono::workspace", path = %path, "no world file");
            return Ok(World::new());
        }
        let text = fs::read_to_string(&path).with_context(|| format!("read world file {path}"))?;
        let value = serde_json::from_str(&text).with_context(|| format!("parse world file {path}"))?;
        World::from_value(value).with_context(|| format!("load world file {path}"))
    }

    /// Parse the features named by `args`, or every feature file under the
    /// features directory when `args` is empty. Arguments may be paths or
    /// glob patterns.
    ///
    /// # Errors
    ///
    /// Returns an error when a pattern is invalid, a file cannot be read, a
    /// named path matches nothing, or a file fails to parse.
    pub fn features<S: AsRef<str>>(
        &self,
        options: &WorkspaceOptions,
        args: &[S],
    ) -> Result<Vec<Feature>> {
        let paths = if args.is_empty() {
            self.discover(options)?
        } else {
            args.iter()
                .map(|arg| self.expand(arg.as_ref()))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect()
        };
        paths.iter().try_fold(Vec::new(), |mut features, path| {
            let text = fs::read_to_string(path).with_context(|| format!("read feature file {path}"))?;
            let parsed = parse_named(path.as_str(), &text)
                .with_context(|| format!("parse feature file {path}"))?;
            features.extend(parsed);
            Ok(features)
        })
    }

    fn expand(&self, arg: &str) -> Result<Vec<Utf8PathBuf>> {
        let pattern = self.resolve(Utf8Path::new(arg));
        let mut matched = Vec::new();
        for entry in glob::glob(pattern.as_str()).with_context(|| format!("invalid pattern {arg}"))? {
            let found = entry.with_context(|| format!("expand pattern {arg}"))?;
            let path = Utf8PathBuf::try_from(found)
                .map_err(|err| anyhow!("pattern {arg} matched a non-UTF-8 path: {err}"))?;
            if path.is_file() {
                matched.push(path);
            }
        }
        ensure!(!matched.is_empty(), "no feature files match {arg}");
        Ok(matched)
    }

    fn discover(&self, options: &WorkspaceOptions) -> Result<Vec<Utf8PathBuf>> {
        let dir = self.resolve(
            options
                .features_dir
                .as_deref()
                .unwrap_or_else(|| Utf8Path::new(DEFAULT_FEATURES_DIR)),
        );
        let mut paths = Vec::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let walked = entry.with_context(|| format!("walk features directory {dir}"))?;
            let path = Utf8Path::from_path(walked.path())
                .ok_or_else(|| anyhow!("non-UTF-8 path under {dir}: {}", walked.path().display()))?;
            if walked.file_type().is_file() && path.extension() == Some(FEATURE_EXTENSION) {
                paths.push(path.to_owned());
            }
        }
        debug!(target: "tsukemono::workspace", dir = %dir, found = paths.len(), "discovered feature files");
        Ok(paths)
    }

    /// Definitions used by [`Workspace::run_tests`].
    #[must_use]
    pub const fn defs(&self) -> &Definitions {
        &self.definitions
    }

    /// Mutable access for registering steps, types and hooks.
    pub const fn defs_mut(&mut self) -> &mut Definitions {
        &mut self.definitions
    }

    /// Install `definitions`, replacing any registered before.
    pub fn set_defs(&mut self, definitions: Definitions) {
        self.definitions = definitions;
    }

    /// Run `features` in `world` against `definitions`.
    ///
    /// # Errors
    ///
    /// Returns an error when the test tree cannot be assembled.
    pub async fn run_tests(
        &self,
        features: Vec<Feature>,
        world: World,
        definitions: &Definitions,
        options: RunTestsOptions,
    ) -> Result<RunResults> {
        run_tests(features, world, definitions, options)
            .await
            .context("run features")
    }
}
