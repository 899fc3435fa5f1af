use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn keeperd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("keeperd"))
}

#[test]
fn stop_without_pid_file_exits_with_code_4() {
    let temp = tempdir().expect("failed to create tempdir");
    let pid_path = temp.path().join("keeper.pid");

    keeperd()
        .arg("stop")
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No running instance"));
}

#[test]
fn stop_with_stale_pid_file_exits_with_code_4() {
    let temp = tempdir().expect("failed to create tempdir");
    let pid_path = temp.path().join("keeper.pid");

    // Record the pid of an already-reaped process.
    let mut child = std::process::Command::new("true")
        .spawn()
        .expect("failed to spawn");
    let dead_pid = child.id();
    child.wait().expect("failed to wait");
    fs::write(&pid_path, format!("{dead_pid}\n")).expect("failed to write pid file");

    keeperd()
        .arg("stop")
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No running instance"));
}

#[test]
fn restart_without_instance_and_no_force_exits_with_code_2() {
    let temp = tempdir().expect("failed to create tempdir");
    let config_path = temp.path().join("keeper.yaml");
    fs::write(&config_path, "workers: {}\n").expect("failed to write config");

    keeperd()
        .arg("restart")
        .arg("--config")
        .arg(&config_path)
        .arg("--pid-file")
        .arg(temp.path().join("keeper.pid"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No instance can be restarted"));
}

#[test]
fn run_against_live_instance_exits_with_code_1_and_names_the_pid() {
    let temp = tempdir().expect("failed to create tempdir");
    let config_path = temp.path().join("keeper.yaml");
    fs::write(&config_path, "workers: {}\n").expect("failed to write config");

    // Use this test process as the "running instance".
    let own_pid = std::process::id();
    let pid_path = temp.path().join("keeper.pid");
    fs::write(&pid_path, format!("{own_pid}\n")).expect("failed to write pid file");

    keeperd()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "Have running instance (PID: {own_pid})"
        )));

    // The conflicting invocation must not touch the existing PID file.
    let contents = fs::read_to_string(&pid_path).expect("pid file still present");
    assert_eq!(contents.trim(), own_pid.to_string());
}

#[test]
fn run_with_missing_manifest_fails() {
    let temp = tempdir().expect("failed to create tempdir");

    keeperd()
        .arg("run")
        .arg("--config")
        .arg(temp.path().join("missing.yaml"))
        .arg("--pid-file")
        .arg(temp.path().join("keeper.pid"))
        .assert()
        .code(70);
}

#[test]
fn rejects_unknown_subcommand() {
    keeperd().arg("frobnicate").assert().failure();
}
