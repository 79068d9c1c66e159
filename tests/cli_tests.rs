//! Integration tests for the binary using `assert_cmd`.
//!
//! These tests run the compiled binary against a temporary project and
//! check what the `parse` and `outline` subcommands print.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use test_support::features::{CALCULATOR, project};

#[test]
fn outline_prints_steps_of_discovered_features() -> Result<()> {
    let (_dir, root) = project(&[("calculator.feature", CALCULATOR)], None)?;
    let mut cmd = Command::cargo_bin("tsukemono").context("locate tsukemono binary")?;
    cmd.arg("-C")
        .arg(root.as_str())
        .arg("outline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Feature: Calculator"))
        .stdout(predicate::str::contains("  Rule: outlines"))
        .stdout(predicate::str::contains("Examples: 2 row(s)"));
    Ok(())
}

#[test]
fn parse_prints_json_for_named_files() -> Result<()> {
    let (_dir, root) = project(&[("calculator.feature", CALCULATOR)], None)?;
    let output = Command::cargo_bin("tsukemono")
        .context("locate tsukemono binary")?
        .current_dir(root.as_std_path())
        .args(["parse", "features/calculator.feature"])
        .output()
        .context("run tsukemono parse")?;
    ensure!(output.status.success(), "parse should succeed");
    let features: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("parse output is JSON")?;
    let description = features
        .get(0)
        .and_then(|feature| feature.get("description"))
        .and_then(serde_json::Value::as_str);
    ensure!(
        description == Some("Calculator"),
        "unexpected description {description:?}"
    );
    Ok(())
}

#[test]
fn malformed_features_fail() -> Result<()> {
    let (_dir, root) = project(&[("broken.feature", "Given a stray step\n")], None)?;
    Command::cargo_bin("tsukemono")
        .context("locate tsukemono binary")?
        .arg("--directory")
        .arg(root.as_str())
        .arg("parse")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.feature"));
    Ok(())
}
