//! CLI integration tests for the shipwright binary.
//!
//! These run the compiled binary and assert on exit codes and the rendered
//! diagnostics. Failing cases pin `max_retries = 0` through a config file so
//! the tests never sit in recovery delays.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn shipwright_cmd() -> Command {
    Command::cargo_bin("shipwright").expect("shipwright binary should build")
}

/// Writes a config file with retries disabled and returns the tempdir.
fn no_retry_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shipwright.toml");
    fs::write(&path, "[errors]\nmax_retries = 0\n").expect("write config");
    (dir, path)
}

#[test]
fn test_help_lists_commands() {
    shipwright_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("manifest"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_version_flag() {
    shipwright_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    shipwright_cmd().assert().failure();
}

#[test]
fn test_test_command_is_placeholder() {
    let dir = tempfile::tempdir().expect("tempdir");
    shipwright_cmd()
        .current_dir(dir.path())
        .args(["test", "--no-color"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not yet implemented"));
}

#[test]
fn test_generate_succeeds_in_writable_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    shipwright_cmd()
        .current_dir(dir.path())
        .args(["generate", "--no-color"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not yet implemented"));
}

#[test]
fn test_push_without_registry_renders_validation_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    shipwright_cmd()
        .current_dir(dir.path())
        .args(["push", "--no-color"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VALIDATION"))
        .stderr(predicate::str::contains("not recoverable"))
        .stderr(predicate::str::contains("no registry configured"));
}

#[test]
fn test_build_with_missing_context_fails() {
    let (_dir, config) = no_retry_config();
    shipwright_cmd()
        .args(["build", "--no-color"])
        .args(["--config", config.to_str().unwrap()])
        .args(["--context", "/no/such/context"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BUILD"))
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_generate_into_missing_directory_fails() {
    let (_dir, config) = no_retry_config();
    shipwright_cmd()
        .args(["generate", "--no-color"])
        .args(["--config", config.to_str().unwrap()])
        .args(["--output", "/no/such/dir/Dockerfile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FILE_WRITE"));
}

#[test]
fn test_missing_config_file_renders_config_load_report() {
    shipwright_cmd()
        .args(["build", "--no-color"])
        .args(["--config", "/no/such/shipwright.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_LOAD"));
}

#[test]
fn test_config_overrides_are_honored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("shipwright.toml");
    fs::write(
        &config,
        "registry = \"registry.example.com\"\n[errors]\nmax_retries = 0\n",
    )
    .expect("write config");

    shipwright_cmd()
        .current_dir(dir.path())
        .args(["push", "--no-color"])
        .args(["--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("not yet implemented"));
}
