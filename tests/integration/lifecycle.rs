#[path = "common/mod.rs"]
mod common;

use std::fs;

use assert_cmd::Command;
use common::{
    is_process_alive, read_pid, wait_for_path, wait_for_path_removed,
    wait_for_process_exit,
};
use tempfile::tempdir;

fn keeperd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("keeperd"))
}

#[test]
fn daemonized_run_tracks_pid_and_stop_clears_it() {
    let temp = tempdir().expect("failed to create tempdir");
    let config_path = temp.path().join("keeper.yaml");
    fs::write(
        &config_path,
        r#"workers:
  main:
    command: "sleep 30"
"#,
    )
    .expect("failed to write config");

    let pid_path = temp.path().join("keeper.pid");

    keeperd()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .arg("--daemonize")
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .success();

    wait_for_path(&pid_path);
    let supervisor_pid = read_pid(&pid_path);
    assert!(
        is_process_alive(supervisor_pid),
        "supervisor {supervisor_pid} should be alive"
    );

    keeperd()
        .arg("stop")
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .success();

    wait_for_path_removed(&pid_path);
    wait_for_process_exit(supervisor_pid);
}

#[test]
fn forced_restart_starts_fresh_instance_when_nothing_is_running() {
    let temp = tempdir().expect("failed to create tempdir");
    let config_path = temp.path().join("keeper.yaml");
    fs::write(&config_path, "workers: {}\n").expect("failed to write config");

    let pid_path = temp.path().join("keeper.pid");

    keeperd()
        .arg("restart")
        .arg("--force")
        .arg("--daemonize")
        .arg("--config")
        .arg(&config_path)
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .success();

    wait_for_path(&pid_path);
    let supervisor_pid = read_pid(&pid_path);
    assert!(is_process_alive(supervisor_pid));

    keeperd()
        .arg("stop")
        .arg("--pid-file")
        .arg(&pid_path)
        .assert()
        .success();

    wait_for_path_removed(&pid_path);
    wait_for_process_exit(supervisor_pid);
}
