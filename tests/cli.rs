// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! CLI-level integration tests
//!
//! These drive the built binary; nothing here invokes real recon tools.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn reconflow() -> Command {
    Command::cargo_bin("reconflow").expect("binary builds")
}

#[test]
fn plan_lists_all_stages() {
    reconflow()
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("subfinder"))
        .stdout(predicate::str::contains("robots-txt"))
        .stdout(predicate::str::contains("21 stages"));
}

#[test]
fn plan_mermaid_renders_graph() {
    reconflow()
        .args(["plan", "--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph TD"))
        .stdout(predicate::str::contains("subfinder --> merge-subdomains"));
}

#[test]
fn plan_dot_renders_graph() {
    reconflow()
        .args(["plan", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph pipeline"));
}

#[test]
fn check_always_exits_zero() {
    reconflow()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Preflight"));
}

#[test]
fn run_rejects_empty_target() {
    reconflow()
        .args(["run", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Target must not be empty"));
}

#[test]
fn dry_run_shows_plan_without_executing() {
    let dir = TempDir::new().unwrap();

    reconflow()
        .args(["-C", dir.path().to_str().unwrap(), "run", "example.com", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example.com"))
        .stdout(predicate::str::contains("nuclei-web"));

    // nothing was staged
    assert!(!dir.path().join("output").exists());
}

#[test]
fn status_in_empty_dir_reports_nothing_staged() {
    let dir = TempDir::new().unwrap();

    reconflow()
        .args(["-C", dir.path().to_str().unwrap(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 of 21 artifacts staged"));
}
