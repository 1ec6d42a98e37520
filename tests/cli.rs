// ABOUTME: Integration tests for the convoy CLI binary.
// ABOUTME: Validates --help output and failure handling that needs no container runtime.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn convoy_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("convoy"))
}

#[test]
fn help_shows_commands() {
    convoy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("scale"))
        .stdout(predicate::str::contains("rm"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn missing_config_fails_with_exit_code_one() {
    let temp_dir = tempfile::tempdir().unwrap();

    convoy_cmd()
        .current_dir(temp_dir.path())
        .arg("up")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: configuration file not found"));
}

#[test]
fn invalid_config_fails_before_contacting_a_runtime() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("convoy.yml"),
        "services:\n  web:\n    image: nginx\n    links: [cache]\n",
    )
    .unwrap();

    convoy_cmd()
        .current_dir(temp_dir.path())
        .arg("ps")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown service: cache"));
}

#[test]
fn explicit_file_that_does_not_exist_fails() {
    convoy_cmd()
        .args(["--file", "/nonexistent/convoy.yml", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
