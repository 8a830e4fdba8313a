//! Integration tests for command-line argument handling.

use assert_cmd::cargo::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_help_lists_server_flags() {
    let mut cmd = Command::new(cargo_bin("camtrap"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--geofence"))
        .stdout(predicate::str::contains("--save-annotated"));
}

#[test]
fn test_invalid_port_is_rejected() {
    let mut cmd = Command::new(cargo_bin("camtrap"));
    cmd.arg("--port").arg("not-a-port");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_threshold_is_rejected() {
    let mut cmd = Command::new(cargo_bin("camtrap"));
    cmd.arg("--annotation-threshold").arg("1.5");

    cmd.assert().failure();
}
