//! Integration tests for the `risu-module` binary entry point.
//!
//! Exercises the subcommands end to end against scripted RISU stand-ins and
//! checks the exit-code contract.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[cfg(unix)]
fn install_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("risu");
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

#[test]
fn check_mode_run_reports_command() {
    let dir = TempDir::new().expect("temp dir");
    let risu = dir.path().join("risu");
    fs::write(&risu, "").expect("write placeholder");

    let mut command = cargo_bin_cmd!("risu-module");
    command
        .arg("run")
        .arg("--risu-path")
        .arg(&risu)
        .arg("--filter")
        .arg("security")
        .arg("--check");
    command
        .assert()
        .success()
        .stdout(contains("Would run RISU diagnostics"))
        .stdout(contains("-l -i security -q --output"));
}

#[test]
fn missing_installation_fails_with_hint() {
    let mut command = cargo_bin_cmd!("risu-module");
    command
        .arg("validate")
        .arg("--risu-path")
        .arg("/nonexistent/bin/risu");
    command
        .assert()
        .code(1)
        .stdout(contains("RISU not found"))
        .stdout(contains("/nonexistent/bin/risu"));
}

#[test]
fn invoke_reads_stdin() {
    let dir = TempDir::new().expect("temp dir");
    let risu = dir.path().join("risu");
    fs::write(&risu, "").expect("write placeholder");
    let record = serde_json::json!({
        "state": "run",
        "risu_path": risu,
        "check_mode": true,
    });

    let mut command = cargo_bin_cmd!("risu-module");
    command.arg("invoke").arg("-").write_stdin(record.to_string());
    command
        .assert()
        .success()
        .stdout(contains("\"cmd\""));
}

#[test]
fn missing_job_status_fails() {
    let dir = TempDir::new().expect("temp dir");

    let mut command = cargo_bin_cmd!("risu-module");
    command
        .arg("--job-dir")
        .arg(dir.path())
        .arg("status")
        .arg("absent");
    command
        .assert()
        .code(1)
        .stderr(contains("risu-job-absent.status"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let mut command = cargo_bin_cmd!("risu-module");
    command.arg("scan");
    command.assert().code(2);
}

#[cfg(unix)]
#[test]
fn validate_runs_real_process() {
    let dir = TempDir::new().expect("temp dir");
    let risu = install_script(dir.path(), "echo 'RISU 3.1.4'\n");

    let mut command = cargo_bin_cmd!("risu-module");
    command
        .arg("--log-format")
        .arg("compact")
        .arg("validate")
        .arg("--risu-path")
        .arg(&risu);
    command
        .assert()
        .success()
        .stdout(contains("RISU is installed and working: RISU 3.1.4"));
}

#[cfg(unix)]
#[test]
fn async_run_can_be_polled() {
    let dir = TempDir::new().expect("temp dir");
    let risu = install_script(dir.path(), "exit 0\n");

    let mut run = cargo_bin_cmd!("risu-module");
    run.arg("--job-dir")
        .arg(dir.path())
        .arg("run")
        .arg("--risu-path")
        .arg(&risu)
        .arg("--async-mode")
        .arg("--job-id")
        .arg("abc");
    run.assert().success().stdout(contains("risu-job-abc.status"));

    let mut status = cargo_bin_cmd!("risu-module");
    status
        .env("RISU_MODULE_JOB_DIR", dir.path())
        .arg("status")
        .arg("abc");
    status
        .assert()
        .success()
        .stdout(contains("\"status\":\"completed\""));
}
