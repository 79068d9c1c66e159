//! Command line interface definition using clap.
//!
//! The binary inspects feature files: it prints their syntax tree as JSON
//! or an outline of the step lines each scenario runs. Running features
//! needs step definitions, which are Rust code, so that happens through
//! the library.

use crate::ast::{Background, Feature, Scenario};
use crate::workspace::{Workspace, WorkspaceOptions};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use std::io::Write;
use tracing::debug;

/// Inspect Gherkin feature files.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change to this directory before doing anything.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Enable verbose logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Feature selection shared by the commands.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct FeatureArgs {
    /// Directory searched when no files are given.
    #[arg(long, value_name = "DIR")]
    pub features_dir: Option<Utf8PathBuf>,

    /// Feature files or glob patterns; defaults to every `*.feature` file
    /// under the features directory.
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Print the parsed features as JSON.
    Parse(FeatureArgs),
    /// Print each scenario with the step lines it runs.
    Outline(FeatureArgs),
}

impl Commands {
    const fn features(&self) -> &FeatureArgs {
        match self {
            Self::Parse(args) | Self::Outline(args) => args,
        }
    }
}

fn load(cli: &Cli) -> Result<Vec<Feature>> {
    let mut workspace = Workspace::new();
    if let Some(dir) = &cli.directory {
        workspace.set_root(dir)?;
    }
    let args = cli.command.features();
    let options = WorkspaceOptions {
        features_dir: args.features_dir.clone(),
        world: None,
    };
    let features = workspace.features(&options, &args.files)?;
    debug!(root = %workspace.root(), count = features.len(), "loaded features");
    Ok(features)
}

fn write_background(out: &mut impl Write, background: &Background, indent: &str) -> Result<()> {
    let header = format!("Background: {}", background.description);
    writeln!(out, "{indent}{}", header.trim_end())?;
    for step in &background.steps {
        writeln!(out, "{indent}  {}", step.source_line())?;
    }
    Ok(())
}

fn write_scenario(out: &mut impl Write, scenario: &Scenario, indent: &str) -> Result<()> {
    let tags = scenario.tags.iter().join(" ");
    if !tags.is_empty() {
        writeln!(out, "{indent}{tags}")?;
    }
    writeln!(out, "{indent}Scenario: {}", scenario.description)?;
    for step in &scenario.steps {
        writeln!(out, "{indent}  {}", step.source_line())?;
    }
    for examples in &scenario.examples {
        writeln!(out, "{indent}  Examples: {} row(s)", examples.rows().count())?;
    }
    Ok(())
}

/// Write an outline of `features` to `out`.
///
/// # Errors
///
/// Returns an error when writing fails.
pub fn write_outline(out: &mut impl Write, features: &[Feature]) -> Result<()> {
    for feature in features {
        writeln!(out, "Feature: {}", feature.description)?;
        if let Some(background) = &feature.background {
            write_background(out, background, "  ")?;
        }
        for scenario in &feature.scenarios {
            write_scenario(out, scenario, "  ")?;
        }
        for rule in &feature.rules {
            writeln!(out, "  Rule: {}", rule.description)?;
            if let Some(background) = &rule.background {
                write_background(out, background, "    ")?;
            }
            for scenario in &rule.scenarios {
                write_scenario(out, scenario, "    ")?;
            }
        }
    }
    Ok(())
}

/// Execute the parsed [`Cli`] command, writing its output to `out`.
///
/// # Errors
///
/// Returns an error when features cannot be loaded or output cannot be
/// written.
pub fn execute(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let features = load(cli)?;
    match &cli.command {
        Commands::Parse(_) => {
            let json = serde_json::to_string_pretty(&features).context("serialise features")?;
            writeln!(out, "{json}")?;
        }
        Commands::Outline(_) => write_outline(out, &features)?,
    }
    Ok(())
}
