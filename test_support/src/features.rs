//! Sample feature text and project directories.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

/// One scenario with a single parameterised step.
pub const SINGLE_STEP: &str = "\
Feature: Values
  Scenario: five
    Given a value of 5
";

/// A background, a rule and a scenario outline.
pub const CALCULATOR: &str = "\
@maths
Feature: Calculator
  Background:
    Given a value of 1

  Scenario: add two
    When I add 2
    Then the total is 3

  Rule: outlines
    Scenario Outline: add <n>
      When I add <n>
      Then the total is <total>
      Examples:
        | n  | total |
        | 4  | 5     |
        | 10 | 11    |
";

/// A project directory holding `features` under `features/` and an
/// optional `world.json`.
///
/// # Errors
///
/// Returns an error when the directory or files cannot be created.
pub fn project(
    features: &[(&str, &str)],
    world: Option<&str>,
) -> anyhow::Result<(TempDir, Utf8PathBuf)> {
    let dir = tempfile::tempdir()?;
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir: {}", path.display()))?;
    fs::create_dir_all(root.join("features"))?;
    for (name, text) in features {
        fs::write(root.join("features").join(name), text)?;
    }
    if let Some(world) = world {
        fs::write(root.join("world.json"), world)?;
    }
    Ok((dir, root))
}
